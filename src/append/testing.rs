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

use std::sync::Arc;
use std::sync::Mutex;

use crate::Error;
use crate::append::Append;
use crate::record::Record;

/// An appender that keeps every record it receives in memory.
///
/// Clones share the same buffer, so a test can hand one clone to a chain and inspect the
/// records through another.
///
/// # Examples
///
/// ```
/// use logservice::append::Capture;
/// use logservice::record::Level;
///
/// let capture = Capture::default();
/// let logger = logservice::builder("app")
///     .chain("test", |c| c.append(capture.clone()))
///     .build()
///     .unwrap();
///
/// logger.warning("this is a warning");
/// assert_eq!(capture.messages(), vec!["this is a warning"]);
/// assert_eq!(capture.records()[0].level(), Level::Warning);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Capture {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Capture {
    /// A snapshot of the captured records.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// The messages of the captured records, in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|record| record.message().to_string())
            .collect()
    }

    /// The number of captured records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    /// Check if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all captured records.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl Append for Capture {
    fn append(&self, record: &Record) -> Result<(), Error> {
        self.records
            .lock()
            .map_err(|_| Error::new("capture buffer lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}
