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

//! Log record and severity levels.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::exception::Exception;

/// The channel name used when none is configured.
pub const DEFAULT_CHANNEL: &str = "app";

/// The severity of a log record, ordered from the least to the most important.
///
/// The numeric codes follow the syslog-derived scale used by most PHP and Java loggers, so that
/// consumers of the JSON output can compare levels without knowing the names.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Detailed debug information.
    Debug,
    /// Interesting events.
    Info,
    /// Normal but significant events.
    Notice,
    /// Exceptional occurrences that are not errors.
    Warning,
    /// Runtime errors that do not require immediate action.
    Error,
    /// Critical conditions.
    Critical,
    /// Action must be taken immediately.
    Alert,
    /// The system is unusable.
    Emergency,
}

impl Level {
    /// All levels, from the least to the most severe.
    pub const ALL: [Level; 8] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
        Level::Alert,
        Level::Emergency,
    ];

    /// Return the upper-case name of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn name(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Alert => "ALERT",
            Level::Emergency => "EMERGENCY",
        }
    }

    /// Return the numeric code of the `Level`.
    pub fn code(&self) -> u16 {
        match self {
            Level::Debug => 100,
            Level::Info => 200,
            Level::Notice => 250,
            Level::Warning => 300,
            Level::Error => 400,
            Level::Critical => 500,
            Level::Alert => 550,
            Level::Emergency => 600,
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for (name, level) in [
            ("debug", Level::Debug),
            ("info", Level::Info),
            ("notice", Level::Notice),
            ("warning", Level::Warning),
            ("warn", Level::Warning),
            ("error", Level::Error),
            ("critical", Level::Critical),
            ("crit", Level::Critical),
            ("alert", Level::Alert),
            ("emergency", Level::Emergency),
            ("emerg", Level::Emergency),
        ] {
            if s.eq_ignore_ascii_case(name) {
                return Ok(level);
            }
        }

        Err(Error::new(format!("malformed level: {s:?}")))
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Level::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A log record: one diagnostic event on its way to the sinks.
///
/// Records are immutable once built. The only mutation happens inside the router, which appends
/// processor output to [`extra`](Record::extra) before any chain sees the record.
#[derive(Clone, Debug)]
pub struct Record {
    time: Timestamp,
    channel: String,
    level: Level,
    message: String,
    context: Map<String, Value>,
    extra: Map<String, Value>,
}

impl Record {
    /// Returns a new builder.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// The observed time.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// The logger channel that emitted the record.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The severity of the record.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The message body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured values supplied by the caller.
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Values appended by processors.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// The normalized exception in `context.exception`, if any.
    pub fn exception(&self) -> Option<&Map<String, Value>> {
        self.context.get("exception").and_then(Value::as_object)
    }

    /// The HTTP status carried by `context.exception`, if any.
    pub fn exception_status(&self) -> Option<u64> {
        self.exception()
            .and_then(|e| e.get("status"))
            .and_then(Value::as_u64)
    }

    /// Create a builder initialized with the current record's values.
    pub fn to_builder(&self) -> RecordBuilder {
        RecordBuilder {
            record: self.clone(),
        }
    }

    pub(crate) fn extend_extra(&mut self, extra: Map<String, Value>) {
        self.extra.extend(extra);
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                time: Timestamp::now(),
                channel: DEFAULT_CHANNEL.to_string(),
                level: Level::Info,
                message: String::new(),
                context: Map::new(),
                extra: Map::new(),
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](Record::time).
    pub fn time(mut self, time: Timestamp) -> Self {
        self.record.time = time;
        self
    }

    /// Set [`channel`](Record::channel).
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.record.channel = channel.into();
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`message`](Record::message).
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Replace the whole [`context`](Record::context).
    pub fn context(mut self, context: Map<String, Value>) -> Self {
        self.record.context = context;
        self
    }

    /// Insert one entry into [`context`](Record::context).
    pub fn context_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.record.context.insert(key.into(), value.into());
        self
    }

    /// Store the normalized form of `exception` under `context.exception`.
    pub fn exception(mut self, exception: &Exception) -> Self {
        self.record
            .context
            .insert("exception".to_string(), exception.to_value());
        self
    }

    /// Insert one entry into [`extra`](Record::extra).
    pub fn extra_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.record.extra.insert(key.into(), value.into());
        self
    }

    /// Invoke the builder and return a `Record`.
    pub fn build(self) -> Record {
        self.record
    }
}
