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

//! Admission filters for sink chains.
//!
//! A chain admits a record when its [`LevelRange`] admits the record's level and every
//! registered [`Predicate`] accepts the record.

pub use self::custom::CustomPredicate;
pub use self::level::LevelRange;
pub use self::predicate::DEFAULT_NOISE;
pub use self::predicate::Predicate;

mod custom;
mod level;
mod predicate;

use crate::record::Record;

/// A severity range plus an ordered list of exclusion predicates.
///
/// # Examples
///
/// ```
/// use logservice::filter::ChainFilter;
/// use logservice::filter::LevelRange;
/// use logservice::filter::Predicate;
/// use logservice::record::Level;
///
/// let filter = ChainFilter::new(LevelRange::at_least(Level::Notice))
///     .predicate(Predicate::ExcludeClientErrors)
///     .predicate(Predicate::exclude_default_noise());
/// assert_eq!(filter.predicates().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ChainFilter {
    range: LevelRange,
    predicates: Vec<Predicate>,
}

impl From<LevelRange> for ChainFilter {
    fn from(range: LevelRange) -> Self {
        ChainFilter::new(range)
    }
}

impl ChainFilter {
    /// Create a filter with the given range and no predicates.
    pub fn new(range: LevelRange) -> Self {
        Self {
            range,
            predicates: vec![],
        }
    }

    /// Replace the severity range, keeping the predicates.
    pub fn with_range(mut self, range: LevelRange) -> Self {
        self.range = range;
        self
    }

    /// Append a predicate. Predicates are evaluated in registration order.
    pub fn predicate(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    /// The severity range.
    pub fn range(&self) -> LevelRange {
        self.range
    }

    /// The registered predicates.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Check if the record passes the range and all predicates.
    pub fn admit(&self, record: &Record) -> bool {
        self.range.admit(record.level()) && self.predicates.iter().all(|p| p.accept(record))
    }
}
