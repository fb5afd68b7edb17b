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

//! Assembly of the router, error bridge and exception handler from a [`Config`].

use std::sync::Arc;

use crate::Append;
use crate::Error;
use crate::append::QueuePublisher;
use crate::append::Stderr;
use crate::append::Stdout;
use crate::append::queue::Exchange;
use crate::bridge::runtime::ErrorBridge;
use crate::config::Config;
use crate::filter::ChainFilter;
use crate::filter::LevelRange;
use crate::filter::Predicate;
use crate::handler::ExceptionHandler;
use crate::handler::HttpPresenter;
use crate::handler::Presentation;
use crate::handler::Responder;
use crate::layout::LineLayout;
use crate::logger::Router;
use crate::processor::Processor;
use crate::processor::RequestInfo;
use crate::processor::WebProcessor;
use crate::trap::Trap;

/// The name of the chain publishing to the message queue.
pub const QUEUE_CHAIN: &str = "queue";
/// The name of the chain writing to stderr.
pub const STDERR_CHAIN: &str = "stderr";
/// The name of the chain writing to stdout.
pub const STDOUT_CHAIN: &str = "stdout";

/// The logging service of one application: a router with the configured chains, the runtime
/// error bridge, and a factory for exception handlers.
///
/// # Examples
///
/// ```
/// use logservice::append::Capture;
/// use logservice::config::Config;
/// use logservice::service::LogService;
///
/// let stdout = Capture::default();
/// let stderr = Capture::default();
/// let service = LogService::builder(Config::default())
///     .stdout(stdout.clone())
///     .stderr(stderr.clone())
///     .build()
///     .unwrap();
///
/// service.router().info("this is info");
/// service.router().warning("this is a warning");
///
/// assert_eq!(stdout.messages(), vec!["this is info"]);
/// assert_eq!(stderr.messages(), vec!["this is a warning"]);
/// ```
#[derive(Debug)]
pub struct LogService {
    config: Config,
    router: Arc<Router>,
    bridge: ErrorBridge,
}

impl LogService {
    pub fn builder(config: Config) -> LogServiceBuilder {
        LogServiceBuilder {
            config,
            stdout: None,
            stderr: None,
            queue_sink: None,
            exchange: None,
            processors: vec![],
            trap: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared router.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// The runtime error bridge, armed with the configured classification.
    pub fn bridge(&self) -> &ErrorBridge {
        &self.bridge
    }

    /// Create an exception handler for one unit of work.
    pub fn exception_handler(&self, presentation: Presentation) -> ExceptionHandler {
        ExceptionHandler::new(self.router.clone(), self.config.boundary, presentation)
    }

    /// Create an HTTP presenter honoring the configured debug flag and problem+json prefixes.
    pub fn http_presenter(
        &self,
        responder: impl Responder + 'static,
        request: RequestInfo,
    ) -> HttpPresenter {
        self.config
            .problem_json_prefixes
            .iter()
            .fold(
                HttpPresenter::new(responder, request).debug(self.config.debug),
                |presenter, prefix| presenter.problem_json_for(prefix.as_str()),
            )
    }

    /// Route records of the `log` crate into this service.
    pub fn install_log_bridge(&self) -> Result<(), Error> {
        crate::bridge::log::setup(self.router.clone())
            .map_err(|err| Error::new("failed to install log bridge").with_source(err))
    }

    /// Log panics through this service.
    pub fn install_panic_hook(&self) {
        crate::bridge::panic::install(self.router.clone());
    }
}

/// A builder for [`LogService`].
///
/// Sinks default to the process stdout and stderr. The queue chain is installed only when an
/// exchange or a queue sink is supplied.
#[must_use = "call `build` to construct the service"]
#[derive(Debug)]
pub struct LogServiceBuilder {
    config: Config,
    stdout: Option<Box<dyn Append>>,
    stderr: Option<Box<dyn Append>>,
    queue_sink: Option<Box<dyn Append>>,
    exchange: Option<Arc<dyn Exchange>>,
    processors: Vec<Box<dyn Processor>>,
    trap: Option<Box<dyn Trap>>,
}

impl LogServiceBuilder {
    /// Replace the stdout sink.
    pub fn stdout(mut self, append: impl Into<Box<dyn Append>>) -> Self {
        self.stdout = Some(append.into());
        self
    }

    /// Replace the stderr sink.
    pub fn stderr(mut self, append: impl Into<Box<dyn Append>>) -> Self {
        self.stderr = Some(append.into());
        self
    }

    /// Replace the queue sink. Takes precedence over [`exchange`](Self::exchange).
    pub fn queue_sink(mut self, append: impl Into<Box<dyn Append>>) -> Self {
        self.queue_sink = Some(append.into());
        self
    }

    /// Publish to `exchange` through a [`QueuePublisher`].
    pub fn exchange(mut self, exchange: impl Exchange) -> Self {
        self.exchange = Some(Arc::new(exchange));
        self
    }

    /// Add the details of the active request to every record.
    pub fn request(self, request: RequestInfo) -> Self {
        self.processor(WebProcessor::new(request))
    }

    pub fn processor(mut self, processor: impl Into<Box<dyn Processor>>) -> Self {
        self.processors.push(processor.into());
        self
    }

    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = Some(trap.into());
        self
    }

    /// Build the service. Chains are registered in the order queue, stderr, stdout.
    pub fn build(self) -> Result<LogService, Error> {
        let config = self.config;
        let layout = || LineLayout::default().include_stacktraces(config.include_stacktraces);

        let mut builder = crate::builder(config.channel.as_str());

        let queue_sink = match (self.queue_sink, self.exchange) {
            (Some(sink), _) => Some(sink),
            (None, Some(exchange)) => {
                let publisher = QueuePublisher::new(exchange, config.app_id.as_str())
                    .with_routing_key(config.queue.routing_key_for(&config.app_id))
                    .with_message_type(config.queue.message_type.as_str())
                    .with_min_level(config.queue.min_level);
                Some(Box::new(publisher) as Box<dyn Append>)
            }
            (None, None) => None,
        };
        if let Some(sink) = queue_sink {
            let mut filter = ChainFilter::new(LevelRange::at_least(config.queue.min_level));
            if config.queue.exclude_client_errors {
                filter = filter.predicate(Predicate::ExcludeClientErrors);
            }
            if !config.queue.exclude_messages.is_empty() {
                filter = filter.predicate(Predicate::exclude_messages(
                    config.queue.exclude_messages.iter().map(String::as_str),
                ));
            }
            builder = builder.chain(QUEUE_CHAIN, |c| c.filter(filter).append(sink));
        }

        let stderr = self
            .stderr
            .unwrap_or_else(|| Box::new(Stderr::default().with_layout(layout())));
        builder = builder.chain(STDERR_CHAIN, |c| {
            c.levels(config.stderr.range()).append(stderr)
        });

        let stdout = self
            .stdout
            .unwrap_or_else(|| Box::new(Stdout::default().with_layout(layout())));
        builder = builder.chain(STDOUT_CHAIN, |c| {
            c.levels(config.stdout.range()).append(stdout)
        });

        for processor in self.processors {
            builder = builder.processor(processor);
        }
        if let Some(trap) = self.trap {
            builder = builder.trap(trap);
        }

        let router = Arc::new(builder.build()?);
        let bridge = ErrorBridge::new(router.clone(), config.classification.clone());
        Ok(LogService {
            config,
            router,
            bridge,
        })
    }
}
