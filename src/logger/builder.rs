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

use crate::Append;
use crate::Error;
use crate::filter::ChainFilter;
use crate::filter::LevelRange;
use crate::filter::Predicate;
use crate::logger::Chain;
use crate::logger::Router;
use crate::processor::Processor;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Create a new empty [`RouterBuilder`] for the given channel.
///
/// # Examples
///
/// ```
/// use logservice::append;
/// use logservice::filter::LevelRange;
/// use logservice::record::Level;
///
/// let router = logservice::builder("app")
///     .chain("stderr", |c| {
///         c.levels(LevelRange::at_least(Level::Notice))
///             .append(append::Stderr::default())
///     })
///     .build()
///     .unwrap();
/// ```
pub fn builder(channel: impl Into<String>) -> RouterBuilder {
    RouterBuilder {
        channel: channel.into(),
        chains: vec![],
        processors: vec![],
        trap: Box::new(DefaultTrap::default()),
    }
}

/// A builder for configuring sink chains, processors and the trap of a [`Router`].
#[must_use = "call `build` to construct the router"]
#[derive(Debug)]
pub struct RouterBuilder {
    channel: String,
    chains: Vec<Chain>,
    processors: Vec<Box<dyn Processor>>,
    trap: Box<dyn Trap>,
}

impl RouterBuilder {
    /// Register a new chain with the [`RouterBuilder`].
    ///
    /// # Examples
    ///
    /// ```
    /// use logservice::append;
    /// use logservice::filter::LevelRange;
    /// use logservice::record::Level;
    ///
    /// logservice::builder("app")
    ///     .chain("stdout", |c| {
    ///         c.levels(LevelRange::between(Level::Debug, Level::Info))
    ///             .append(append::Stdout::default())
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn chain<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(ChainBuilder<false>) -> ChainBuilder<true>,
    {
        self.chains.push(f(ChainBuilder::new(name.into())).build());
        self
    }

    /// Register an already constructed chain.
    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chains.push(chain);
        self
    }

    /// Register a processor. Processors run once per record, in registration order.
    pub fn processor(mut self, processor: impl Into<Box<dyn Processor>>) -> Self {
        self.processors.push(processor.into());
        self
    }

    /// Set the trap that receives sink failures.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the [`Router`].
    ///
    /// # Errors
    ///
    /// Return an error if two chains share a name.
    pub fn build(self) -> Result<Router, Error> {
        let mut router = Router::new(self.channel, vec![], self.processors, self.trap);
        for chain in self.chains {
            router.add_chain(chain)?;
        }
        Ok(router)
    }
}

/// A builder for configuring a sink chain: its level range, predicates and appenders.
#[derive(Debug)]
pub struct ChainBuilder<const APPEND: bool> {
    name: String,
    filter: ChainFilter,
    appends: Vec<Box<dyn Append>>,
}

impl ChainBuilder<false> {
    fn new(name: String) -> Self {
        ChainBuilder {
            name,
            filter: ChainFilter::default(),
            appends: vec![],
        }
    }

    /// Set the level range of this chain. Default to all levels.
    pub fn levels(mut self, range: LevelRange) -> Self {
        self.filter = self.filter.with_range(range);
        self
    }

    /// Add an exclusion predicate to this chain.
    ///
    /// # Examples
    ///
    /// ```
    /// use logservice::append;
    /// use logservice::filter::LevelRange;
    /// use logservice::filter::Predicate;
    /// use logservice::record::Level;
    ///
    /// logservice::builder("app")
    ///     .chain("stderr", |c| {
    ///         c.levels(LevelRange::at_least(Level::Notice))
    ///             .predicate(Predicate::ExcludeClientErrors)
    ///             .append(append::Stderr::default())
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn predicate(mut self, predicate: impl Into<Predicate>) -> Self {
        self.filter = self.filter.predicate(predicate);
        self
    }

    /// Replace the whole filter of this chain.
    pub fn filter(mut self, filter: ChainFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl ChainBuilder<true> {
    fn build(self) -> Chain {
        Chain::from_parts(self.name, self.filter, self.appends)
    }
}

impl<const APPEND: bool> ChainBuilder<APPEND> {
    /// Add an appender to this chain.
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> ChainBuilder<true> {
        self.appends.push(append.into());
        ChainBuilder {
            name: self.name,
            filter: self.filter,
            appends: self.appends,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::Capture;
    use crate::exception::Exception;
    use crate::record::Level;
    use crate::record::Record;

    fn failed_request(status: u16) -> Record {
        Record::builder()
            .level(Level::Error)
            .message(status.to_string())
            .exception(&Exception::http(status, "request failed"))
            .build()
    }

    #[test]
    fn levels_keep_earlier_predicates() {
        let capture = Capture::default();
        let router = builder("app")
            .chain("queue", |c| {
                c.predicate(Predicate::ExcludeClientErrors)
                    .levels(LevelRange::at_least(Level::Notice))
                    .append(capture.clone())
            })
            .build()
            .unwrap();

        let chain = router.chain("queue").unwrap();
        assert_eq!(chain.filter().predicates().len(), 1);
        assert_eq!(chain.filter().range(), LevelRange::at_least(Level::Notice));

        router.dispatch(failed_request(404));
        router.dispatch(failed_request(500));
        router.info("below range");
        assert_eq!(capture.messages(), vec!["500"]);
    }

    #[test]
    fn predicate_order_relative_to_levels_does_not_matter() {
        let before = Capture::default();
        let after = Capture::default();
        let router = builder("app")
            .chain("before", |c| {
                c.predicate(Predicate::exclude_default_noise())
                    .levels(LevelRange::at_least(Level::Warning))
                    .append(before.clone())
            })
            .chain("after", |c| {
                c.levels(LevelRange::at_least(Level::Warning))
                    .predicate(Predicate::exclude_default_noise())
                    .append(after.clone())
            })
            .build()
            .unwrap();

        router.error("MySQL server has gone away");
        router.error("disk full");
        router.notice("below range");

        assert_eq!(before.messages(), vec!["disk full"]);
        assert_eq!(after.messages(), before.messages());
    }
}
