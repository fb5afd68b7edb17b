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

use std::fmt;
use std::io;
use std::io::Write;

use http::header::CONTENT_LENGTH;

use crate::Error;
use crate::exception::Exception;
use crate::handler::render;
use crate::handler::render::ErrorPage;
use crate::processor::RequestInfo;

/// How an uncaught exception is shown to a human, chosen once per unit of work.
pub enum Presentation {
    /// A command-line runner renders the exception.
    Console(Box<dyn Console>),
    /// An error response is emitted for the active request.
    Http(HttpPresenter),
    /// The string form of the exception is written to the given output, usually stdout.
    Fallback(Box<dyn Write + Send>),
}

impl Presentation {
    /// [`Presentation::Fallback`] on the process stdout.
    pub fn fallback() -> Self {
        Presentation::Fallback(Box::new(io::stdout()))
    }

    /// [`Presentation::Console`] on the process stderr.
    pub fn console() -> Self {
        Presentation::Console(Box::new(ConsoleOutput::new(io::stderr())))
    }

    pub(crate) fn present(&mut self, exception: &Exception) -> Result<(), Error> {
        match self {
            Presentation::Console(console) => console.render_exception(exception)?,
            Presentation::Http(http) => http.present(exception)?,
            Presentation::Fallback(out) => {
                writeln!(out, "{exception}")?;
                out.flush()?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presentation::Console(_) => f.write_str("Console"),
            Presentation::Http(http) => f.debug_tuple("Http").field(http).finish(),
            Presentation::Fallback(_) => f.write_str("Fallback"),
        }
    }
}

/// A command-line runner that can render exceptions.
pub trait Console: Send {
    /// Whether the runner catches exceptions itself.
    ///
    /// The exception handler switches this off so that exceptions reach it.
    fn set_catch_exceptions(&mut self, catch: bool);

    /// Render `exception` for the user.
    fn render_exception(&mut self, exception: &Exception) -> io::Result<()>;
}

/// A [`Console`] that writes a rendering with an `Exception trace:` section to a writer.
#[derive(Debug)]
pub struct ConsoleOutput<W> {
    out: W,
    decorated: bool,
    catch_exceptions: bool,
}

impl<W: Write + Send> ConsoleOutput<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            decorated: false,
            catch_exceptions: true,
        }
    }

    /// Color the exception header.
    pub fn decorated(mut self, decorated: bool) -> Self {
        self.decorated = decorated;
        self
    }

    /// Whether the runner would catch exceptions itself.
    pub fn catch_exceptions(&self) -> bool {
        self.catch_exceptions
    }

    /// Consume the console and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Console for ConsoleOutput<W> {
    fn set_catch_exceptions(&mut self, catch: bool) {
        self.catch_exceptions = catch;
    }

    fn render_exception(&mut self, exception: &Exception) -> io::Result<()> {
        let text = render::console_text(exception, self.decorated);
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}

/// An HTTP response produced for an uncaught exception.
pub type Response = http::Response<Vec<u8>>;

/// The response channel of the active request.
pub trait Responder: Send {
    /// Emit headers and body.
    fn send(&mut self, response: &Response) -> io::Result<()>;
}

/// A [`Responder`] that writes an HTTP/1.1 response to a writer.
#[derive(Debug)]
pub struct WriteResponder<W> {
    out: W,
}

impl<W: Write + Send> WriteResponder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Responder for WriteResponder<W> {
    fn send(&mut self, response: &Response) -> io::Result<()> {
        let status = response.status();
        write!(
            self.out,
            "HTTP/1.1 {} {}\r\n",
            status.as_str(),
            status.canonical_reason().unwrap_or_default()
        )?;
        for (name, value) in response.headers() {
            self.out.write_all(name.as_str().as_bytes())?;
            self.out.write_all(b": ")?;
            self.out.write_all(value.as_bytes())?;
            self.out.write_all(b"\r\n")?;
        }
        if !response.headers().contains_key(CONTENT_LENGTH) {
            write!(self.out, "content-length: {}\r\n", response.body().len())?;
        }
        self.out.write_all(b"\r\n")?;
        self.out.write_all(response.body())?;
        self.out.flush()
    }
}

/// Presents exceptions as HTTP error responses.
///
/// Requests whose path starts with one of the problem+json prefixes get an
/// `application/problem+json` body, every other request gets an HTML page.
pub struct HttpPresenter {
    responder: Box<dyn Responder>,
    request: RequestInfo,
    debug: bool,
    problem_json_prefixes: Vec<String>,
}

impl fmt::Debug for HttpPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPresenter")
            .field("request", &self.request)
            .field("debug", &self.debug)
            .field("problem_json_prefixes", &self.problem_json_prefixes)
            .finish_non_exhaustive()
    }
}

impl HttpPresenter {
    pub fn new(responder: impl Responder + 'static, request: RequestInfo) -> Self {
        Self {
            responder: Box::new(responder),
            request,
            debug: false,
            problem_json_prefixes: vec![],
        }
    }

    /// Show exception details in HTML pages.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Answer requests under `prefix` with problem+json.
    pub fn problem_json_for(mut self, prefix: impl Into<String>) -> Self {
        self.problem_json_prefixes.push(prefix.into());
        self
    }

    /// The body format used for the active request.
    pub fn page(&self) -> ErrorPage {
        let path = self.request.path().unwrap_or_default();
        if self
            .problem_json_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            ErrorPage::ProblemJson
        } else {
            ErrorPage::Html
        }
    }

    fn present(&mut self, exception: &Exception) -> Result<(), Error> {
        let response = self.page().response(exception, self.debug)?;
        self.responder.send(&response)?;
        Ok(())
    }
}
