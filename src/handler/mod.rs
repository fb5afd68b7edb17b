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

//! Handling of exceptions that escape a unit of work.
//!
//! Every uncaught exception is logged first and presented second. The record carries the
//! normalized exception with a stack trace under `context.exception`, so that the queue sink
//! can apply its client-error exclusion. Presentation happens in exactly one
//! [`Presentation`] mode.

use std::sync::Arc;

use http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::exception::Exception;
use crate::logger::Router;
use crate::record::Level;
use crate::record::Record;

mod presentation;
pub mod render;

pub use self::presentation::Console;
pub use self::presentation::ConsoleOutput;
pub use self::presentation::HttpPresenter;
pub use self::presentation::Presentation;
pub use self::presentation::Responder;
pub use self::presentation::Response;
pub use self::presentation::WriteResponder;

/// Where an uncaught exception was caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The top-level application boundary.
    Application,
    /// The handling of an HTTP request.
    Request,
    /// The execution of a console command.
    Command,
    /// Application set-up, before a request or command runs.
    Configure,
}

/// The level an uncaught exception is logged at, per [`Origin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryLevels {
    pub application: Level,
    pub request: Level,
    /// Used instead of `request` for exceptions whose HTTP status is below 500.
    pub request_client_error: Level,
    pub command: Level,
    pub configure: Level,
}

impl Default for BoundaryLevels {
    fn default() -> Self {
        Self {
            application: Level::Error,
            request: Level::Critical,
            request_client_error: Level::Error,
            command: Level::Error,
            configure: Level::Error,
        }
    }
}

impl BoundaryLevels {
    /// The level to log `exception` at when it is caught at `origin`.
    pub fn level_for(&self, origin: Origin, exception: &Exception) -> Level {
        match origin {
            Origin::Application => self.application,
            Origin::Command => self.command,
            Origin::Configure => self.configure,
            Origin::Request => match exception.status() {
                Some(status) if status < 500 => self.request_client_error,
                _ => self.request,
            },
        }
    }
}

/// The result of handling one uncaught exception.
#[derive(Debug)]
pub struct Handled {
    status: StatusCode,
    presentation_error: Option<Error>,
}

impl Handled {
    /// The status of the error response, see [`render::response_status`].
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The process exit code for command-line runs.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// The error raised while presenting, if presentation failed after logging.
    pub fn presentation_error(&self) -> Option<&Error> {
        self.presentation_error.as_ref()
    }
}

/// Logs and presents uncaught exceptions.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logservice::Exception;
/// use logservice::append::Capture;
/// use logservice::handler::BoundaryLevels;
/// use logservice::handler::ExceptionHandler;
/// use logservice::handler::Origin;
/// use logservice::handler::Presentation;
///
/// let capture = Capture::default();
/// let router = logservice::builder("app")
///     .chain("capture", |c| c.append(capture.clone()))
///     .build()
///     .unwrap();
///
/// let mut handler = ExceptionHandler::new(
///     Arc::new(router),
///     BoundaryLevels::default(),
///     Presentation::Fallback(Box::new(std::io::sink())),
/// );
/// let result: Result<(), _> = handler.run(Origin::Application, || {
///     Err(Exception::new("Exception", "Lorem ipsum"))
/// });
///
/// assert_eq!(result.unwrap_err().status(), 500);
/// assert_eq!(capture.messages(), vec![r#"Uncaught Exception Exception: "Lorem ipsum""#]);
/// ```
#[derive(Debug)]
pub struct ExceptionHandler {
    router: Arc<Router>,
    levels: BoundaryLevels,
    presentation: Presentation,
}

impl ExceptionHandler {
    /// Create a handler. A console presentation is told not to catch exceptions itself.
    pub fn new(router: Arc<Router>, levels: BoundaryLevels, mut presentation: Presentation) -> Self {
        if let Presentation::Console(console) = &mut presentation {
            console.set_catch_exceptions(false);
        }

        Self {
            router,
            levels,
            presentation,
        }
    }

    pub fn levels(&self) -> &BoundaryLevels {
        &self.levels
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Log `exception` and then present it.
    ///
    /// The record is dispatched before presentation starts, so a failing presentation never
    /// loses the log entry.
    pub fn handle(&mut self, exception: Exception, origin: Origin) -> Handled {
        let exception = exception.ensure_trace();
        let level = self.levels.level_for(origin, &exception);

        let record = Record::builder()
            .channel(self.router.channel())
            .level(level)
            .message(format!(
                "Uncaught Exception {}: \"{}\"",
                exception.kind(),
                exception.message()
            ))
            .exception(&exception)
            .build();
        self.router.dispatch(record);

        let presentation_error = self.presentation.present(&exception).err();
        Handled {
            status: render::response_status(&exception),
            presentation_error,
        }
    }

    /// Run one unit of work, handling the exception it fails with.
    pub fn run<T, E, F>(&mut self, origin: Origin, f: F) -> Result<T, Handled>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Exception>,
    {
        f().map_err(|err| self.handle(err.into(), origin))
    }
}
