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

use jiff::tz::TimeZone;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::layout::Layout;
use crate::record::Record;

/// A layout that formats a log record as one human-readable line.
///
/// Output format:
///
/// ```text
/// [2024-08-11 22:44:57] app.WARNING: this is a warning [] []
/// [2024-08-11 22:44:57] app.INFO: this is info {"user":42} {"url":"/foo"}
/// ```
///
/// The two trailing groups are the record's context and extra; empty maps render as `[]`.
///
/// An exception in the context renders as `[object] (<class>(code: <code>): <message> at
/// <file>)`. With [`include_stacktraces`](LineLayout::include_stacktraces), its trace follows
/// after a `[stacktrace]` marker and escaped line breaks in the output are expanded.
///
/// # Examples
///
/// ```
/// use logservice::layout::LineLayout;
///
/// let line_layout = LineLayout::default().include_stacktraces(true);
/// ```
#[derive(Default, Debug, Clone)]
pub struct LineLayout {
    tz: Option<TimeZone>,
    include_stacktraces: bool,
}

impl LineLayout {
    /// Sets the timezone for timestamps.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }

    /// Render exception traces and keep line breaks inline.
    pub fn include_stacktraces(mut self, include: bool) -> Self {
        self.include_stacktraces = include;
        self
    }

    fn normalize_exception(&self, exception: &Map<String, Value>) -> Value {
        let field = |key: &str| match exception.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let mut text = format!(
            "[object] ({}(code: {}): {}",
            field("class"),
            field("code"),
            field("message")
        );
        if exception.contains_key("file") {
            text.push_str(" at ");
            text.push_str(&field("file"));
        }
        text.push(')');
        if self.include_stacktraces && exception.contains_key("trace") {
            text.push_str("\n[stacktrace]\n");
            text.push_str(&field("trace"));
        }
        if let Some(Value::Object(previous)) = exception.get("previous") {
            text.push_str(", previous: ");
            if let Value::String(previous) = self.normalize_exception(previous) {
                text.push_str(&previous);
            }
        }
        Value::String(text)
    }

    fn render_map(&self, map: &Map<String, Value>) -> Result<String, Error> {
        if map.is_empty() {
            return Ok("[]".to_string());
        }

        let mut normalized = map.clone();
        if let Some(Value::Object(exception)) = map.get("exception") {
            normalized.insert("exception".to_string(), self.normalize_exception(exception));
        }

        let json = serde_json::to_string(&normalized)?;
        if self.include_stacktraces {
            Ok(json.replace("\\r", "\r").replace("\\n", "\n"))
        } else {
            Ok(json)
        }
    }
}

impl Layout for LineLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let zoned = match self.tz.clone() {
            Some(tz) => record.time().to_zoned(tz),
            None => record.time().to_zoned(TimeZone::system()),
        };
        let time = zoned.strftime("%Y-%m-%d %H:%M:%S");
        let channel = record.channel();
        let level = record.level().name();
        let message = record.message();
        let context = self.render_map(record.context())?;
        let extra = self.render_map(record.extra())?;

        Ok(format!("[{time}] {channel}.{level}: {message} {context} {extra}").into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::exception::Exception;
    use crate::record::Level;

    fn format(layout: &LineLayout, record: &Record) -> String {
        String::from_utf8(layout.format(record).unwrap()).unwrap()
    }

    fn at_noon() -> Timestamp {
        "2024-08-11T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn empty_context_and_extra_render_as_brackets() {
        let layout = LineLayout::default().timezone(TimeZone::UTC);
        let record = Record::builder()
            .time(at_noon())
            .level(Level::Warning)
            .message("this is a warning")
            .build();

        assert_eq!(
            format(&layout, &record),
            "[2024-08-11 12:00:00] app.WARNING: this is a warning [] []"
        );
    }

    #[test]
    fn context_and_extra_render_as_json() {
        let layout = LineLayout::default().timezone(TimeZone::UTC);
        let record = Record::builder()
            .time(at_noon())
            .message("this is info")
            .context_value("user", 42)
            .extra_value("url", "/foobar")
            .build();

        assert_eq!(
            format(&layout, &record),
            r#"[2024-08-11 12:00:00] app.INFO: this is info {"user":42} {"url":"/foobar"}"#
        );
    }

    #[test]
    fn stacktraces_expand_when_enabled() {
        let exception = Exception::new("Exception", "Lorem ipsum")
            .with_location("src/lib.rs", 10)
            .with_trace("#0 first\n#1 second");
        let record = Record::builder()
            .time(at_noon())
            .level(Level::Error)
            .message("Uncaught Exception Exception: \"Lorem ipsum\"")
            .exception(&exception)
            .build();

        let expanded = format(
            &LineLayout::default()
                .timezone(TimeZone::UTC)
                .include_stacktraces(true),
            &record,
        );
        assert!(expanded.contains("[object] (Exception(code: 0): Lorem ipsum at src/lib.rs:10)"));
        assert!(expanded.contains("[stacktrace]\n#0 first\n#1 second"));

        let compact = format(&LineLayout::default().timezone(TimeZone::UTC), &record);
        assert!(!compact.contains("[stacktrace]"));
        assert!(!compact.contains('\n'));
    }
}
