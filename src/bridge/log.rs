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

//! Route records of the [`log`] crate facade through a [`Router`].

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::logger::Router;
use crate::record::Level;
use crate::record::Record;

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warning,
            log::Level::Info => Self::Info,
            log::Level::Debug | log::Level::Trace => Self::Debug,
        }
    }
}

/// A [`log::Log`] implementation forwarding to a shared [`Router`].
///
/// The `log` target becomes the record's channel; key-values become context entries, rendered
/// with their `Display` form.
#[derive(Debug, Clone)]
pub struct LogBridge {
    router: Arc<Router>,
}

impl LogBridge {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

/// Install a [`LogBridge`] over `router` as the global `log` logger.
///
/// # Errors
///
/// Return an error if a global logger has already been set.
pub fn setup(router: Arc<Router>) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(router)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

struct KvCollector<'a> {
    kvs: &'a mut Map<String, Value>,
}

impl<'kvs> log::kv::VisitSource<'kvs> for KvCollector<'_> {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.kvs.insert(key.to_string(), value.to_string().into());
        Ok(())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut context = Map::new();
        let mut visitor = KvCollector { kvs: &mut context };
        // visiting into a map cannot fail
        let _ = record.key_values().visit(&mut visitor);

        let channel = match record.target() {
            "" => self.router.channel(),
            target => target,
        };
        let record = Record::builder()
            .channel(channel)
            .level(record.level().into())
            .message(record.args().to_string())
            .context(context)
            .build();
        self.router.dispatch(record);
    }

    fn flush(&self) {
        self.router.flush();
    }
}

#[cfg(test)]
mod tests {
    use log::Log;

    use super::*;
    use crate::append::Capture;

    #[test]
    fn forwards_level_target_and_key_values() {
        let capture = Capture::default();
        let router = crate::builder("app")
            .chain("capture", |c| c.append(capture.clone()))
            .build()
            .unwrap();
        let bridge = LogBridge::new(Arc::new(router));

        let kvs: &[(&str, i32)] = &[("attempt", 3)];
        bridge.log(
            &log::Record::builder()
                .args(format_args!("retrying upload"))
                .level(log::Level::Warn)
                .target("uploader")
                .key_values(&kvs)
                .build(),
        );
        bridge.log(
            &log::Record::builder()
                .args(format_args!("tracing detail"))
                .level(log::Level::Trace)
                .target("")
                .build(),
        );

        let records = capture.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level(), Level::Warning);
        assert_eq!(records[0].channel(), "uploader");
        assert_eq!(records[0].message(), "retrying upload");
        assert_eq!(records[0].context()["attempt"], "3");
        assert_eq!(records[1].level(), Level::Debug);
        assert_eq!(records[1].channel(), "app");
    }
}
