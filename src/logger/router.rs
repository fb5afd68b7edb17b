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

use std::cell::RefCell;

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::logger::Chain;
use crate::processor::Processor;
use crate::record::Level;
use crate::record::Record;
use crate::trap::Trap;

thread_local! {
    static DISPATCHING: RefCell<Vec<*const Router>> = const { RefCell::new(Vec::new()) };
}

// Marks a router as dispatching on the current thread until dropped.
struct DispatchGuard {
    router: *const Router,
}

impl DispatchGuard {
    fn enter(router: &Router) -> Option<DispatchGuard> {
        let router = router as *const Router;
        DISPATCHING.with(|dispatching| {
            let mut dispatching = dispatching.borrow_mut();
            if dispatching.contains(&router) {
                None
            } else {
                dispatching.push(router);
                Some(DispatchGuard { router })
            }
        })
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|dispatching| {
            dispatching.borrow_mut().retain(|r| *r != self.router);
        });
    }
}

/// Routes every record to each sink chain that admits it.
///
/// Chains are evaluated independently and in registration order. Failures of an appender are
/// handed to the router's [`Trap`] and never returned to the code that logged the record.
///
/// Chains can be added and removed while the router is being set up (`&mut self`); once it is
/// shared, chains can only be enabled or disabled.
///
/// # Examples
///
/// ```
/// use logservice::append::Capture;
/// use logservice::filter::LevelRange;
/// use logservice::record::Level;
///
/// let stdout = Capture::default();
/// let stderr = Capture::default();
/// let router = logservice::builder("app")
///     .chain("stderr", |c| {
///         c.levels(LevelRange::at_least(Level::Notice))
///             .append(stderr.clone())
///     })
///     .chain("stdout", |c| {
///         c.levels(LevelRange::between(Level::Debug, Level::Info))
///             .append(stdout.clone())
///     })
///     .build()
///     .unwrap();
///
/// router.info("this is info");
/// router.warning("this is a warning");
///
/// assert_eq!(stdout.messages(), vec!["this is info"]);
/// assert_eq!(stderr.messages(), vec!["this is a warning"]);
/// ```
#[derive(Debug)]
pub struct Router {
    channel: String,
    chains: Vec<Chain>,
    processors: Vec<Box<dyn Processor>>,
    trap: Box<dyn Trap>,
}

impl Router {
    pub(super) fn new(
        channel: String,
        chains: Vec<Chain>,
        processors: Vec<Box<dyn Processor>>,
        trap: Box<dyn Trap>,
    ) -> Self {
        Self {
            channel,
            chains,
            processors,
            trap,
        }
    }

    /// The channel name stamped on records created by this router.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Register a chain after the existing ones.
    ///
    /// # Errors
    ///
    /// Return an error if a chain with the same name is already registered.
    pub fn add_chain(&mut self, chain: Chain) -> Result<(), Error> {
        if self.chain(chain.name()).is_some() {
            return Err(Error::new("duplicate chain name").with_context("name", chain.name()));
        }
        self.chains.push(chain);
        Ok(())
    }

    /// Unregister a chain, returning it if it existed.
    pub fn remove_chain(&mut self, name: &str) -> Option<Chain> {
        let index = self.chains.iter().position(|c| c.name() == name)?;
        Some(self.chains.remove(index))
    }

    /// Look up a chain by name.
    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name() == name)
    }

    /// The names of the registered chains, in dispatch order.
    pub fn chain_names(&self) -> Vec<&str> {
        self.chains.iter().map(Chain::name).collect()
    }

    /// Enable or disable a chain. Return `false` if no chain has that name.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.chain(name) {
            Some(chain) => {
                chain.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Register a processor after the existing ones.
    pub fn add_processor(&mut self, processor: impl Into<Box<dyn Processor>>) {
        self.processors.push(processor.into());
    }

    /// The names of the chains that would receive `record`, in dispatch order.
    ///
    /// Processors are not run, so predicates that read `extra` see the record as given.
    pub fn admitting_chains(&self, record: &Record) -> Vec<&str> {
        self.chains
            .iter()
            .filter(|c| c.admit(record))
            .map(Chain::name)
            .collect()
    }

    /// Run the processors on `record` and forward it to every admitting chain.
    ///
    /// A record emitted while this thread is already dispatching through the same router (for
    /// example by an appender that logs) is dropped and reported to the trap. Other routers
    /// still receive records from inside an appender.
    pub fn dispatch(&self, mut record: Record) {
        let Some(_guard) = DispatchGuard::enter(self) else {
            self.trap.trap(
                &Error::new("dropped record logged during dispatch")
                    .with_context("message", record.message()),
            );
            return;
        };

        if !self.processors.is_empty() {
            let mut extra = Map::new();
            for processor in &self.processors {
                processor.process(&record, &mut extra);
            }
            record.extend_extra(extra);
        }

        for chain in &self.chains {
            if chain.admit(&record) {
                chain.append(&record, |err| {
                    self.trap.trap(&err.with_context("chain", chain.name()));
                });
            }
        }
    }

    /// Log a message at `level`.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.log_with(level, message, Map::new());
    }

    /// Log a message at `level` with structured context.
    pub fn log_with(&self, level: Level, message: impl Into<String>, context: Map<String, Value>) {
        let record = Record::builder()
            .channel(self.channel.as_str())
            .level(level)
            .message(message)
            .context(context)
            .build();
        self.dispatch(record);
    }

    /// Log a message at `DEBUG`.
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    /// Log a message at `INFO`.
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    /// Log a message at `NOTICE`.
    pub fn notice(&self, message: impl Into<String>) {
        self.log(Level::Notice, message);
    }

    /// Log a message at `WARNING`.
    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message);
    }

    /// Log a message at `ERROR`.
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// Log a message at `CRITICAL`.
    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message);
    }

    /// Log a message at `ALERT`.
    pub fn alert(&self, message: impl Into<String>) {
        self.log(Level::Alert, message);
    }

    /// Log a message at `EMERGENCY`.
    pub fn emergency(&self, message: impl Into<String>) {
        self.log(Level::Emergency, message);
    }

    /// Flush every chain. Failures go to the trap.
    pub fn flush(&self) {
        for chain in &self.chains {
            chain.flush(|err| {
                self.trap.trap(&err.with_context("chain", chain.name()));
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::Append;
    use crate::append::Capture;
    use crate::filter::LevelRange;

    #[derive(Debug, Default, Clone)]
    struct TrapCapture(Arc<Mutex<Vec<String>>>);

    impl Trap for TrapCapture {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Append for Failing {
        fn append(&self, _: &Record) -> Result<(), Error> {
            Err(Error::new("sink unavailable"))
        }
    }

    #[derive(Debug)]
    struct Reentrant {
        router: Arc<Mutex<Option<Arc<Router>>>>,
    }

    impl Append for Reentrant {
        fn append(&self, record: &Record) -> Result<(), Error> {
            if let Some(router) = self.router.lock().unwrap().as_ref() {
                router.info(format!("echo of {}", record.message()));
            }
            Ok(())
        }
    }

    #[test]
    fn duplicate_chain_names_are_rejected() {
        let mut router = crate::builder("app")
            .chain("stderr", |c| c.append(Capture::default()))
            .build()
            .unwrap();

        let err = router
            .add_chain(Chain::new("stderr", LevelRange::default(), Capture::default()))
            .unwrap_err();
        assert_eq!(err.context("name"), Some("stderr"));
        assert_eq!(router.chain_names(), vec!["stderr"]);
    }

    #[test]
    fn empty_router_drops_records() {
        let router = crate::builder("app").build().unwrap();
        router.emergency("nobody listens");
        assert!(router.chain_names().is_empty());
    }

    #[test]
    fn disabled_chain_receives_nothing() {
        let capture = Capture::default();
        let router = crate::builder("app")
            .chain("capture", |c| c.append(capture.clone()))
            .build()
            .unwrap();

        assert!(router.set_enabled("capture", false));
        router.error("while disabled");
        assert!(router.set_enabled("capture", true));
        router.error("while enabled");
        assert!(!router.set_enabled("missing", true));

        assert_eq!(capture.messages(), vec!["while enabled"]);
    }

    #[test]
    fn sink_failure_goes_to_trap_and_other_chains_still_receive() {
        let trap = TrapCapture::default();
        let capture = Capture::default();
        let router = crate::builder("app")
            .chain("broken", |c| c.append(Failing))
            .chain("capture", |c| c.append(capture.clone()))
            .trap(trap.clone())
            .build()
            .unwrap();

        router.warning("still delivered");

        assert_eq!(capture.messages(), vec!["still delivered"]);
        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].contains("sink unavailable"));
        assert!(trapped[0].contains("chain: broken"));
    }

    #[test]
    fn recursive_logging_is_dropped() {
        let trap = TrapCapture::default();
        let capture = Capture::default();
        let slot = Arc::new(Mutex::new(None));
        let router = Arc::new(
            crate::builder("app")
                .chain("reentrant", |c| {
                    c.append(Reentrant {
                        router: slot.clone(),
                    })
                })
                .chain("capture", |c| c.append(capture.clone()))
                .trap(trap.clone())
                .build()
                .unwrap(),
        );
        *slot.lock().unwrap() = Some(router.clone());

        router.info("original");
        *slot.lock().unwrap() = None;

        assert_eq!(capture.messages(), vec!["original"]);
        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].contains("echo of original"));
    }

    #[test]
    fn appender_may_log_into_another_router() {
        let outer_trap = TrapCapture::default();
        let inner_trap = TrapCapture::default();
        let inner_capture = Capture::default();
        let inner = Arc::new(
            crate::builder("inner")
                .chain("capture", |c| c.append(inner_capture.clone()))
                .trap(inner_trap.clone())
                .build()
                .unwrap(),
        );
        let slot = Arc::new(Mutex::new(Some(inner.clone())));
        let outer = crate::builder("outer")
            .chain("forward", |c| {
                c.append(Reentrant {
                    router: slot.clone(),
                })
            })
            .trap(outer_trap.clone())
            .build()
            .unwrap();

        outer.info("original");
        // the guard is released once dispatch returns
        inner.info("direct");

        assert_eq!(inner_capture.messages(), vec!["echo of original", "direct"]);
        assert!(outer_trap.0.lock().unwrap().is_empty());
        assert!(inner_trap.0.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_appender_does_not_stop_the_rest_of_its_chain() {
        let trap = TrapCapture::default();
        let capture = Capture::default();
        let router = crate::builder("app")
            .chain("multi", |c| c.append(Failing).append(capture.clone()))
            .trap(trap.clone())
            .build()
            .unwrap();

        router.error("hello");

        assert_eq!(capture.messages(), vec!["hello"]);
        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].contains("sink unavailable"));
        assert!(trapped[0].contains("chain: multi"));
    }

    #[derive(Debug, Default)]
    struct Counting(std::sync::atomic::AtomicUsize);

    impl Processor for Arc<Counting> {
        fn process(&self, _: &Record, extra: &mut Map<String, Value>) {
            let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            extra.insert("sequence".to_string(), Value::from(n));
        }
    }

    #[test]
    fn processors_run_once_per_record() {
        let counting = Arc::new(Counting::default());
        let first = Capture::default();
        let second = Capture::default();
        let router = crate::builder("app")
            .chain("first", |c| c.append(first.clone()))
            .chain("second", |c| c.append(second.clone()))
            .processor(counting.clone())
            .build()
            .unwrap();

        router.info("one");
        router.info("two");

        assert_eq!(counting.0.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(first.records()[1].extra()["sequence"], 1);
        assert_eq!(second.records()[1].extra()["sequence"], 1);
    }

    #[test]
    fn removing_and_re_adding_a_chain_keeps_dispatch_decisions() {
        let capture = Capture::default();
        let mut router = crate::builder("app")
            .chain("stdout", |c| {
                c.levels(LevelRange::between(Level::Debug, Level::Info))
                    .append(capture.clone())
            })
            .build()
            .unwrap();

        let records: Vec<Record> = Level::ALL
            .iter()
            .map(|level| Record::builder().level(*level).message(level.name()).build())
            .collect();
        let before: Vec<Vec<String>> = records
            .iter()
            .map(|r| {
                router
                    .admitting_chains(r)
                    .into_iter()
                    .map(String::from)
                    .collect()
            })
            .collect();

        let chain = router.remove_chain("stdout").unwrap();
        assert!(router.remove_chain("stdout").is_none());
        router.add_chain(chain).unwrap();

        for (record, expected) in records.iter().zip(&before) {
            assert_eq!(&router.admitting_chains(record), expected);
        }
    }

    #[test]
    fn log_with_keeps_context_and_channel() {
        let capture = Capture::default();
        let router = crate::builder("billing")
            .chain("capture", |c| c.append(capture.clone()))
            .build()
            .unwrap();

        let mut context = Map::new();
        context.insert("invoice".to_string(), Value::from(42));
        router.log_with(Level::Notice, "invoice sent", context);

        let records = capture.records();
        assert_eq!(records[0].channel(), "billing");
        assert_eq!(records[0].level(), Level::Notice);
        assert_eq!(records[0].context()["invoice"], 42);
    }
}
