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

//! Converts runtime error signals into log records or faults.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::exception::Exception;
use crate::logger::Router;
use crate::record::Level;

/// The kind of a runtime error signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Notice,
    Warning,
    Deprecated,
    Strict,
    UserNotice,
    UserWarning,
    UserDeprecated,
    Error,
    UserError,
    RecoverableError,
    CoreError,
    CoreWarning,
    CompileError,
    CompileWarning,
    Parse,
    Unknown,
}

impl SignalKind {
    /// The human-readable label used as message prefix.
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::Notice => "Notice",
            SignalKind::Warning => "Warning",
            SignalKind::Deprecated => "Deprecated",
            SignalKind::Strict => "Runtime Notice",
            SignalKind::UserNotice => "User Notice",
            SignalKind::UserWarning => "User Warning",
            SignalKind::UserDeprecated => "User Deprecated",
            SignalKind::Error => "Fatal Error",
            SignalKind::UserError => "User Error",
            SignalKind::RecoverableError => "Catchable Fatal Error",
            SignalKind::CoreError => "Core Error",
            SignalKind::CoreWarning => "Core Warning",
            SignalKind::CompileError => "Compile Error",
            SignalKind::CompileWarning => "Compile Warning",
            SignalKind::Parse => "Parse Error",
            SignalKind::Unknown => "Unknown Error",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A runtime error signal: an anomaly reported by the runtime rather than raised as an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signal {
    kind: SignalKind,
    message: String,
    file: Option<String>,
    line: Option<u32>,
}

impl Signal {
    pub fn new(kind: SignalKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    /// Set the location that raised the signal.
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What the bridge does with a signal of a given kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Log at the level and continue.
    Log(Level),
    /// Abort the unit of work with a [`RuntimeFault`].
    Raise,
}

/// Maps non-fatal signal kinds to log levels. Kinds not in the table are fatal.
///
/// The default table logs notices at `INFO` and warnings, deprecations and strict-mode notices
/// at `WARNING`.
///
/// # Examples
///
/// ```
/// use logservice::bridge::runtime::Classification;
/// use logservice::bridge::runtime::Disposition;
/// use logservice::bridge::runtime::SignalKind;
/// use logservice::record::Level;
///
/// let table = Classification::default();
/// assert_eq!(table.classify(SignalKind::Notice), Disposition::Log(Level::Info));
/// assert_eq!(table.classify(SignalKind::UserError), Disposition::Raise);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classification {
    non_fatal: BTreeMap<SignalKind, Level>,
}

impl Default for Classification {
    fn default() -> Self {
        Classification::empty()
            .non_fatal(SignalKind::Notice, Level::Info)
            .non_fatal(SignalKind::Warning, Level::Warning)
            .non_fatal(SignalKind::Deprecated, Level::Warning)
            .non_fatal(SignalKind::UserNotice, Level::Info)
            .non_fatal(SignalKind::UserWarning, Level::Warning)
            .non_fatal(SignalKind::UserDeprecated, Level::Warning)
            .non_fatal(SignalKind::Strict, Level::Warning)
    }
}

impl Classification {
    /// A table in which every kind is fatal.
    pub fn empty() -> Self {
        Self {
            non_fatal: BTreeMap::new(),
        }
    }

    /// Log `kind` at `level` instead of raising it.
    pub fn non_fatal(mut self, kind: SignalKind, level: Level) -> Self {
        self.non_fatal.insert(kind, level);
        self
    }

    /// Raise `kind`.
    pub fn fatal(mut self, kind: SignalKind) -> Self {
        self.non_fatal.remove(&kind);
        self
    }

    /// Decide what to do with a signal of `kind`.
    pub fn classify(&self, kind: SignalKind) -> Disposition {
        match self.non_fatal.get(&kind) {
            Some(level) => Disposition::Log(*level),
            None => Disposition::Raise,
        }
    }
}

/// A fatal runtime signal converted into an error.
///
/// Propagate it to the unit-of-work boundary, where the
/// [`ExceptionHandler`](crate::handler::ExceptionHandler) logs and presents it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeFault {
    kind: SignalKind,
    message: String,
    file: Option<String>,
    line: Option<u32>,
}

impl RuntimeFault {
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

impl std::error::Error for RuntimeFault {}

impl From<RuntimeFault> for Exception {
    fn from(fault: RuntimeFault) -> Self {
        let exception = Exception::new(fault.kind.label(), fault.message);
        match (fault.file, fault.line) {
            (Some(file), Some(line)) => exception.with_location(file, line),
            _ => exception,
        }
    }
}

/// Bridges runtime error signals into the router.
///
/// The bridge is armed from construction on and handles signals for as long as it lives:
/// non-fatal signals become one record each and execution continues; fatal and unrecognized
/// signals become a [`RuntimeFault`] for the caller to propagate.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logservice::append::Capture;
/// use logservice::bridge::runtime::Classification;
/// use logservice::bridge::runtime::ErrorBridge;
/// use logservice::bridge::runtime::SignalKind;
///
/// let capture = Capture::default();
/// let router = Arc::new(
///     logservice::builder("app")
///         .chain("capture", |c| c.append(capture.clone()))
///         .build()
///         .unwrap(),
/// );
/// let bridge = ErrorBridge::new(router, Classification::default());
///
/// assert!(bridge.trigger(SignalKind::Deprecated, "old api").is_ok());
/// assert!(bridge.trigger(SignalKind::UserError, "broken").is_err());
/// assert_eq!(capture.messages(), vec!["Deprecated: old api"]);
/// ```
#[derive(Debug, Clone)]
pub struct ErrorBridge {
    router: Arc<Router>,
    classification: Classification,
}

impl ErrorBridge {
    pub fn new(router: Arc<Router>, classification: Classification) -> Self {
        Self {
            router,
            classification,
        }
    }

    /// The classification table in use.
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Handle one signal.
    ///
    /// # Errors
    ///
    /// Return a [`RuntimeFault`] if the signal's kind is fatal. Nothing is logged in that case;
    /// the fault is logged once it reaches the exception boundary.
    pub fn handle(&self, signal: Signal) -> Result<(), RuntimeFault> {
        match self.classification.classify(signal.kind) {
            Disposition::Log(level) => {
                let mut context = Map::new();
                context.insert("kind".to_string(), Value::from(signal.kind.label()));
                if let Some(file) = &signal.file {
                    context.insert("file".to_string(), Value::from(file.as_str()));
                }
                if let Some(line) = signal.line {
                    context.insert("line".to_string(), Value::from(line));
                }
                let message = format!("{}: {}", signal.kind.label(), signal.message);
                self.router.log_with(level, message, context);
                Ok(())
            }
            Disposition::Raise => Err(RuntimeFault {
                kind: signal.kind,
                message: signal.message,
                file: signal.file,
                line: signal.line,
            }),
        }
    }

    /// Raise a signal of `kind` with `message` from application code.
    pub fn trigger(&self, kind: SignalKind, message: impl Into<String>) -> Result<(), RuntimeFault> {
        self.handle(Signal::new(kind, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::Capture;

    fn bridge_with_capture(classification: Classification) -> (ErrorBridge, Capture) {
        let capture = Capture::default();
        let router = crate::builder("app")
            .chain("capture", |c| c.append(capture.clone()))
            .build()
            .unwrap();
        (ErrorBridge::new(Arc::new(router), classification), capture)
    }

    #[test]
    fn non_fatal_signals_each_produce_one_record() {
        let (bridge, capture) = bridge_with_capture(Classification::default());

        bridge.trigger(SignalKind::UserNotice, "this is a user notice").unwrap();
        bridge.trigger(SignalKind::UserWarning, "this is a user warning").unwrap();
        bridge
            .handle(
                Signal::new(SignalKind::Warning, "fopen() expects at least 2 parameters, 0 given")
                    .at("src/command.rs", 42),
            )
            .unwrap();

        let records = capture.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].level(), Level::Info);
        assert_eq!(records[0].message(), "User Notice: this is a user notice");
        assert_eq!(records[1].level(), Level::Warning);
        assert_eq!(
            records[2].message(),
            "Warning: fopen() expects at least 2 parameters, 0 given"
        );
        assert_eq!(records[2].context()["file"], "src/command.rs");
        assert_eq!(records[2].context()["line"], 42);
    }

    #[test]
    fn fatal_signal_raises_without_logging() {
        let (bridge, capture) = bridge_with_capture(Classification::default());

        let fault = bridge
            .trigger(SignalKind::UserError, "this is a user error")
            .unwrap_err();

        assert_eq!(fault.kind(), SignalKind::UserError);
        assert_eq!(fault.to_string(), "User Error: this is a user error");
        assert!(capture.is_empty());
    }

    #[test]
    fn unknown_kind_is_fatal_by_default() {
        let (bridge, _) = bridge_with_capture(Classification::default());
        assert!(bridge.trigger(SignalKind::Unknown, "what was that").is_err());
    }

    #[test]
    fn classification_can_be_changed() {
        let table = Classification::default()
            .fatal(SignalKind::Deprecated)
            .non_fatal(SignalKind::RecoverableError, Level::Error);
        let (bridge, capture) = bridge_with_capture(table);

        assert!(bridge.trigger(SignalKind::Deprecated, "old").is_err());
        assert!(bridge.trigger(SignalKind::RecoverableError, "recovered").is_ok());
        assert_eq!(capture.records()[0].level(), Level::Error);
    }

    #[test]
    fn fault_converts_to_exception_with_location() {
        let (bridge, _) = bridge_with_capture(Classification::empty());
        let fault = bridge
            .handle(Signal::new(SignalKind::Error, "call to undefined function").at("main.rs", 7))
            .unwrap_err();
        let exception = Exception::from(fault);

        assert_eq!(exception.kind(), "Fatal Error");
        assert_eq!(exception.message(), "call to undefined function");
        assert_eq!(exception.file(), Some("main.rs"));
        assert_eq!(exception.line(), Some(7));
    }

    #[test]
    fn classification_deserializes_from_names() {
        let table: Classification =
            serde_json::from_str(r#"{"notice":"WARNING","user_deprecated":"notice"}"#).unwrap();
        assert_eq!(table.classify(SignalKind::Notice), Disposition::Log(Level::Warning));
        assert_eq!(
            table.classify(SignalKind::UserDeprecated),
            Disposition::Log(Level::Notice)
        );
        assert_eq!(table.classify(SignalKind::Warning), Disposition::Raise);
    }
}
