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

//! Service configuration.
//!
//! Every field has a default, so an empty document yields the standard routing policy:
//! `DEBUG..INFO` to stdout, `NOTICE` and above to stderr, and `NOTICE` and above to the queue
//! with client errors and known noise excluded.

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::bridge::runtime::Classification;
use crate::filter::DEFAULT_NOISE;
use crate::filter::LevelRange;
use crate::handler::BoundaryLevels;
use crate::record::DEFAULT_CHANNEL;
use crate::record::Level;

/// Root configuration of a [`LogService`](crate::service::LogService).
///
/// # Examples
///
/// ```
/// use logservice::config::Config;
/// use logservice::record::Level;
///
/// let config = Config::from_json_str(r#"{"app_id": "billing", "stderr": {"min": "ERROR"}}"#).unwrap();
/// assert_eq!(config.app_id, "billing");
/// assert_eq!(config.stderr.min, Level::Error);
/// assert_eq!(config.channel, "app");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// The channel stamped on records.
    pub channel: String,

    /// The application id used in queue message properties and routing keys.
    pub app_id: String,

    /// Records written to stdout.
    pub stdout: LevelConfig,

    /// Records written to stderr.
    pub stderr: LevelConfig,

    /// The queue chain. Only installed when an exchange is supplied.
    pub queue: QueueConfig,

    /// Which runtime signals are logged instead of raised.
    pub classification: Classification,

    /// The level uncaught exceptions are logged at.
    pub boundary: BoundaryLevels,

    /// Show exception details on HTML error pages.
    pub debug: bool,

    /// Expand stack traces in text sinks.
    pub include_stacktraces: bool,

    /// Request path prefixes answered with problem+json error bodies.
    pub problem_json_prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            app_id: DEFAULT_CHANNEL.to_string(),
            stdout: LevelConfig {
                min: Level::Debug,
                max: Some(Level::Info),
            },
            stderr: LevelConfig {
                min: Level::Notice,
                max: None,
            },
            queue: QueueConfig::default(),
            classification: Classification::default(),
            boundary: BoundaryLevels::default(),
            debug: false,
            include_stacktraces: true,
            problem_json_prefixes: vec![],
        }
    }
}

impl Config {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        serde_json::from_str(s)
            .map_err(|err| Error::new("failed to parse configuration").with_source(err))
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::from_io_error(err).with_context("path", path.display())
        })?;
        Config::from_json_str(&content).map_err(|err| err.with_context("path", path.display()))
    }
}

/// A severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LevelConfig {
    pub min: Level,
    #[serde(default)]
    pub max: Option<Level>,
}

impl LevelConfig {
    pub fn range(&self) -> LevelRange {
        match self.max {
            Some(max) => LevelRange::between(self.min, max),
            None => LevelRange::at_least(self.min),
        }
    }
}

/// The queue chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// The exchange the records are published to.
    pub exchange: String,

    /// The routing key; `<app_id>.log.error` when unset.
    pub routing_key: Option<String>,

    /// The message type property.
    pub message_type: String,

    /// The lowest level that is published.
    pub min_level: Level,

    /// Drop records whose exception carries a 4xx status.
    pub exclude_client_errors: bool,

    /// Drop records whose message contains any of these substrings.
    pub exclude_messages: Vec<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            exchange: "log_exchange".to_string(),
            routing_key: None,
            message_type: "error".to_string(),
            min_level: Level::Notice,
            exclude_client_errors: true,
            exclude_messages: DEFAULT_NOISE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl QueueConfig {
    /// The routing key for `app_id`.
    pub fn routing_key_for(&self, app_id: &str) -> String {
        match &self.routing_key {
            Some(key) => key.clone(),
            None => format!("{app_id}.log.error"),
        }
    }
}
