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

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::Append;
use crate::Error;
use crate::filter::ChainFilter;
use crate::record::Record;

/// A named sink chain: a [`ChainFilter`] in front of one or more appenders.
///
/// A record reaches the appenders iff the chain is enabled, its level falls within the filter's
/// range, and every predicate accepts it.
#[derive(Debug)]
pub struct Chain {
    name: String,
    filter: ChainFilter,
    appends: Vec<Box<dyn Append>>,
    enabled: AtomicBool,
}

impl Chain {
    /// Create an enabled chain with one appender.
    ///
    /// # Examples
    ///
    /// ```
    /// use logservice::append::Stderr;
    /// use logservice::filter::LevelRange;
    /// use logservice::Chain;
    /// use logservice::record::Level;
    ///
    /// let chain = Chain::new("stderr", LevelRange::at_least(Level::Notice), Stderr::default());
    /// assert!(chain.is_enabled());
    /// ```
    pub fn new(
        name: impl Into<String>,
        filter: impl Into<ChainFilter>,
        append: impl Into<Box<dyn Append>>,
    ) -> Self {
        Chain::from_parts(name.into(), filter.into(), vec![append.into()])
    }

    pub(super) fn from_parts(
        name: String,
        filter: ChainFilter,
        appends: Vec<Box<dyn Append>>,
    ) -> Self {
        debug_assert!(!appends.is_empty(), "A Chain must have at least one append");

        Self {
            name,
            filter,
            appends,
            enabled: AtomicBool::new(true),
        }
    }

    /// The unique name of the chain.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The admission filter.
    pub fn filter(&self) -> &ChainFilter {
        &self.filter
    }

    /// Check if the chain currently receives records.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(super) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Check if the chain would forward `record` to its appenders.
    pub fn admit(&self, record: &Record) -> bool {
        self.is_enabled() && self.filter.admit(record)
    }

    /// Hand `record` to every appender. A failing appender does not stop the ones after it;
    /// each failure is passed to `on_error`.
    pub(super) fn append(&self, record: &Record, mut on_error: impl FnMut(Error)) {
        for append in &self.appends {
            if let Err(err) = append.append(record) {
                on_error(err);
            }
        }
    }

    pub(super) fn flush(&self, mut on_error: impl FnMut(Error)) {
        for append in &self.appends {
            if let Err(err) = append.flush() {
                on_error(err);
            }
        }
    }
}
