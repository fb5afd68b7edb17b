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

use crate::record::Level;

/// A severity filter admitting levels within an inclusive range.
///
/// From the least to the most severe, the levels are `DEBUG`, `INFO`, `NOTICE`, `WARNING`,
/// `ERROR`, `CRITICAL`, `ALERT` and `EMERGENCY`.
///
/// # Examples
///
/// ```
/// use logservice::filter::LevelRange;
/// use logservice::record::Level;
///
/// let stderr = LevelRange::at_least(Level::Notice);
/// assert!(stderr.admit(Level::Emergency));
/// assert!(!stderr.admit(Level::Info));
///
/// let stdout = LevelRange::between(Level::Debug, Level::Info);
/// assert!(stdout.admit(Level::Info));
/// assert!(!stdout.admit(Level::Notice));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelRange {
    min: Level,
    max: Option<Level>,
}

impl Default for LevelRange {
    fn default() -> Self {
        LevelRange::at_least(Level::Debug)
    }
}

impl LevelRange {
    /// Admit `min` and everything more severe.
    pub fn at_least(min: Level) -> Self {
        Self { min, max: None }
    }

    /// Admit levels between `min` and `max`, both inclusive.
    ///
    /// A range with `min` more severe than `max` admits nothing.
    pub fn between(min: Level, max: Level) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// The least severe admitted level.
    pub fn min(&self) -> Level {
        self.min
    }

    /// The most severe admitted level, `None` meaning unbounded.
    pub fn max(&self) -> Option<Level> {
        self.max
    }

    /// Check if `level` falls within the range.
    pub fn admit(&self, level: Level) -> bool {
        self.min <= level && self.max.is_none_or(|max| level <= max)
    }
}
