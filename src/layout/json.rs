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

use jiff::Timestamp;
use jiff::tz::TimeZone;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::layout::Layout;
use crate::record::Record;

/// A JSON layout for formatting log records, one object per record.
///
/// Output format:
///
/// ```json
/// {"timestamp":"2024-08-11T22:44:57.172051+08:00","channel":"app","level":300,"level_name":"WARNING","message":"this is a warning","context":{},"extra":{"url":"/foo"}}
/// ```
///
/// # Examples
///
/// ```
/// use logservice::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default();
/// ```
#[derive(Default, Debug, Clone)]
pub struct JsonLayout {
    tz: Option<TimeZone>,
}

impl JsonLayout {
    /// Sets the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logservice::layout::JsonLayout;
    ///
    /// let json_layout = JsonLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
struct RecordLine<'a> {
    timestamp: String,
    channel: &'a str,
    level: u16,
    level_name: &'static str,
    message: &'a str,
    context: &'a Map<String, Value>,
    extra: &'a Map<String, Value>,
}

impl Layout for JsonLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let record_line = RecordLine {
            timestamp: format_timestamp(record.time(), self.tz.as_ref()),
            channel: record.channel(),
            level: record.level().code(),
            level_name: record.level().name(),
            message: record.message(),
            context: record.context(),
            extra: record.extra(),
        };

        Ok(serde_json::to_vec(&record_line)?)
    }
}

fn format_timestamp(timestamp: Timestamp, tz: Option<&TimeZone>) -> String {
    let zoned = match tz {
        Some(tz) => timestamp.to_zoned(tz.clone()),
        None => timestamp.to_zoned(TimeZone::system()),
    };
    zoned.strftime("%Y-%m-%dT%H:%M:%S.%6f%:z").to_string()
}
