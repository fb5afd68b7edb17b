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

//! Exceptions: application faults that escape to the unit-of-work boundary.

use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;
use std::fmt;
use std::io;

use serde_json::Map;
use serde_json::Value;

/// A fault that terminates the current unit of work.
///
/// `Exception` is the value the [`ExceptionHandler`](crate::handler::ExceptionHandler) logs and
/// presents, and the value stored in `context.exception` of a record (see [`Exception::to_value`]).
///
/// # Examples
///
/// ```
/// use logservice::Exception;
///
/// let e = Exception::http(404, "page not found");
/// assert_eq!(e.status(), Some(404));
/// assert_eq!(e.to_string(), "HttpException: page not found");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exception {
    kind: String,
    message: String,
    code: i64,
    status: Option<u16>,
    file: Option<String>,
    line: Option<u32>,
    trace: Option<String>,
    previous: Option<Box<Exception>>,
}

impl Exception {
    /// Create a new exception of the given kind.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            code: 0,
            status: None,
            file: None,
            line: None,
            trace: None,
            previous: None,
        }
    }

    /// Create an exception carrying an HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Exception::new("HttpException", message).with_status(status)
    }

    /// Create an exception from any error, walking its `source()` chain into
    /// [`previous`](Exception::previous).
    ///
    /// The kind is the unqualified type name of `E`.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut exception = Exception::new(short_type_name::<E>(), err.to_string());
        exception.previous = chain_sources(err.source());
        exception
    }

    /// Create an exception from a type-erased error.
    pub fn from_dyn_error(kind: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut exception = Exception::new(kind, err.to_string());
        exception.previous = chain_sources(err.source());
        exception
    }

    /// Set the application-defined code.
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Set the HTTP status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the source location where the exception was raised.
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Set the formatted stack trace.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Set the exception that caused this one.
    pub fn with_previous(mut self, previous: Exception) -> Self {
        self.previous = Some(Box::new(previous));
        self
    }

    /// Capture the current stack trace if none is set yet.
    pub fn ensure_trace(mut self) -> Self {
        if self.trace.is_none() {
            let backtrace = Backtrace::force_capture();
            if backtrace.status() == BacktraceStatus::Captured {
                self.trace = Some(backtrace.to_string());
            }
        }
        self
    }

    /// The kind (class name) of the exception.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The application-defined code, `0` by default.
    pub fn code(&self) -> i64 {
        self.code
    }

    /// The HTTP status, if the exception carries one.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The source file where the exception was raised.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The source line where the exception was raised.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The formatted stack trace.
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    /// The exception that caused this one.
    pub fn previous(&self) -> Option<&Exception> {
        self.previous.as_deref()
    }

    /// The normalized JSON form stored under `context.exception`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("class".to_string(), Value::from(self.kind.as_str()));
        map.insert("message".to_string(), Value::from(self.message.as_str()));
        map.insert("code".to_string(), Value::from(self.code));
        if let Some(status) = self.status {
            map.insert("status".to_string(), Value::from(status));
        }
        if let Some(file) = &self.file {
            let location = match self.line {
                Some(line) => format!("{file}:{line}"),
                None => file.clone(),
            };
            map.insert("file".to_string(), Value::from(location));
        }
        if let Some(trace) = &self.trace {
            map.insert("trace".to_string(), Value::from(trace.as_str()));
        }
        if let Some(previous) = &self.previous {
            map.insert("previous".to_string(), previous.to_value());
        }
        Value::Object(map)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(trace) = &self.trace {
            write!(f, "\nStack trace:\n{trace}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.previous
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<crate::Error> for Exception {
    fn from(err: crate::Error) -> Self {
        Exception::from_error(&err)
    }
}

impl From<io::Error> for Exception {
    fn from(err: io::Error) -> Self {
        Exception::from_error(&err)
    }
}

impl From<anyhow::Error> for Exception {
    fn from(err: anyhow::Error) -> Self {
        let root: &(dyn std::error::Error + 'static) = err.as_ref();
        Exception::from_dyn_error("Error", root)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Exception {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Exception::from_dyn_error("Error", err.as_ref())
    }
}

fn chain_sources(source: Option<&(dyn std::error::Error + 'static)>) -> Option<Box<Exception>> {
    source.map(|err| Box::new(Exception::from_dyn_error("Error", err)))
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}
