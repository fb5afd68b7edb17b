// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Human-facing renderings of an uncaught exception.

use http::HeaderValue;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde::Serialize;

use crate::Error;
use crate::exception::Exception;
use crate::handler::Response;

const GENERIC_TITLE: &str = "Whoops, looks like something went wrong.";
const NOT_FOUND_TITLE: &str = "Sorry, the page you are looking for could not be found.";

/// The body format of an HTTP error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPage {
    /// An HTML page; the message and trace are shown in debug mode only.
    Html,
    /// An `application/problem+json` document with title, message, code and trace.
    ProblemJson,
}

impl ErrorPage {
    /// Build the error response for `exception`.
    ///
    /// The status is given by [`response_status`].
    pub fn response(&self, exception: &Exception, debug: bool) -> Result<Response, Error> {
        let (content_type, body) = match self {
            ErrorPage::Html => ("text/html; charset=UTF-8", html_page(exception, debug).into_bytes()),
            ErrorPage::ProblemJson => ("application/problem+json", problem_json(exception)?),
        };

        let mut response = Response::new(body);
        *response.status_mut() = response_status(exception);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Ok(response)
    }
}

/// The status of the error response for `exception`.
///
/// This is the exception's HTTP status if it is a client or server error status, and
/// `500 Internal Server Error` otherwise.
pub fn response_status(exception: &Exception) -> StatusCode {
    exception
        .status()
        .and_then(|status| StatusCode::from_u16(status).ok())
        .filter(|status| status.is_client_error() || status.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Serialize)]
struct Problem<'a> {
    title: &'a str,
    message: &'a str,
    code: i64,
    trace: String,
}

/// Render `exception` as a problem+json document.
pub fn problem_json(exception: &Exception) -> Result<Vec<u8>, Error> {
    let problem = Problem {
        title: exception.message(),
        message: exception.message(),
        code: exception.code(),
        trace: exception.to_string(),
    };
    Ok(serde_json::to_vec(&problem)?)
}

/// Render `exception` as an HTML error page.
pub fn html_page(exception: &Exception, debug: bool) -> String {
    let title = match exception.status() {
        Some(404) if !debug => NOT_FOUND_TITLE,
        _ => GENERIC_TITLE,
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\" />\n");
    html.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    html.push_str(&format!("<h1>{title}</h1>\n"));
    if debug {
        let mut current = Some(exception);
        while let Some(e) = current {
            html.push_str("<div class=\"exception\">\n");
            html.push_str(&format!(
                "<h2><span class=\"exception_class\">{}</span></h2>\n",
                escape_html(e.kind())
            ));
            html.push_str(&format!(
                "<span class=\"exception_message\">{}</span>\n",
                escape_html(e.message())
            ));
            html.push_str("<ol class=\"traces list_exception\">\n");
            for line in e.trace().unwrap_or_default().lines() {
                html.push_str(&format!("<li>{}</li>\n", escape_html(line.trim())));
            }
            html.push_str("</ol>\n</div>\n");
            current = e.previous();
        }
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Render `exception` for a terminal, coloring the header when `decorated`.
pub fn console_text(exception: &Exception, decorated: bool) -> String {
    let header = format!("[{}]", exception.kind());
    let header = paint(&header, decorated);

    let mut text = String::from("\n");
    if let (Some(file), Some(line)) = (exception.file(), exception.line()) {
        text.push_str(&format!("In {file} line {line}:\n\n"));
    }
    text.push_str(&format!("  {header}\n"));
    for line in exception.message().lines() {
        text.push_str(&format!("  {line}\n"));
    }
    text.push_str("\nException trace:\n");
    match exception.trace() {
        Some(trace) => {
            for line in trace.lines() {
                text.push_str(&format!("  {}\n", line.trim_end()));
            }
        }
        None => text.push_str("  (no trace available)\n"),
    }
    if let Some(previous) = exception.previous() {
        text.push_str("\nPrevious exception:");
        text.push_str(&console_text(previous, decorated));
    }
    text
}

#[cfg(feature = "colored")]
fn paint(text: &str, decorated: bool) -> String {
    use colored::Colorize;

    if decorated {
        text.white().on_red().bold().to_string()
    } else {
        text.to_string()
    }
}

#[cfg(not(feature = "colored"))]
fn paint(text: &str, _: bool) -> String {
    text.to_string()
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escapes_message_and_lists_trace_in_debug() {
        let e = Exception::new("UndefinedFunction", r#"Attempted to call function "does_not_exist""#)
            .with_trace("#0 main.rs:1\n#1 {main}");
        let html = html_page(&e, true);

        assert!(html.contains(
            "<span class=\"exception_message\">Attempted to call function &quot;does_not_exist&quot;</span>"
        ));
        assert!(html.contains("<ol class=\"traces list_exception\">"));
        assert!(html.contains("<li>#1 {main}</li>"));
    }

    #[test]
    fn html_hides_details_without_debug() {
        let e = Exception::http(404, "no route for /missing");
        let html = html_page(&e, false);
        assert!(html.contains(NOT_FOUND_TITLE));
        assert!(!html.contains("no route for /missing"));
    }

    #[test]
    fn problem_json_response() {
        let e = Exception::http(401, "No access").with_code(401);
        let response = ErrorPage::ProblemJson.response(&e, false).unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["title"], "No access");
        assert_eq!(body["message"], "No access");
        assert_eq!(body["code"], 401);
        assert_eq!(body["trace"], "HttpException: No access");
    }

    #[test]
    fn status_outside_error_classes_becomes_500() {
        for (status, expected) in [
            (Some(410), StatusCode::GONE),
            (Some(418), StatusCode::IM_A_TEAPOT),
            (Some(503), StatusCode::SERVICE_UNAVAILABLE),
            (Some(42), StatusCode::INTERNAL_SERVER_ERROR),
            (Some(204), StatusCode::INTERNAL_SERVER_ERROR),
            (Some(1000), StatusCode::INTERNAL_SERVER_ERROR),
            (None, StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            let mut e = Exception::new("Exception", "x");
            if let Some(status) = status {
                e = e.with_status(status);
            }
            let response = ErrorPage::Html.response(&e, false).unwrap();
            assert_eq!(response.status(), expected, "status {status:?}");
        }
    }

    #[test]
    fn console_text_has_header_and_trace_section() {
        let e = Exception::new("Exception", "throwing in execute").with_location("foo.rs", 3);
        let text = console_text(&e, false);
        assert!(text.contains("In foo.rs line 3:"));
        assert!(text.contains("  [Exception]\n  throwing in execute\n"));
        assert!(text.contains("Exception trace:"));
    }
}
