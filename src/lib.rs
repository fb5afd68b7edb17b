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

//! Logservice is the logging and error-handling layer of a web or console application.
//!
//! # Overview
//!
//! Records are routed by a [`Router`] to named sink chains. Each chain admits a severity band and
//! may exclude records through predicates, e.g. exceptions carrying a 4xx HTTP status or known
//! database noise. Runtime signals are bridged into the router by the
//! [`ErrorBridge`](bridge::runtime::ErrorBridge), and exceptions that escape a unit of work are
//! logged and then presented by the [`ExceptionHandler`](handler::ExceptionHandler).
//!
//! # Examples
//!
//! Route informational records to stdout and everything from `NOTICE` up to stderr:
//!
//! ```
//! use logservice::append;
//! use logservice::filter::LevelRange;
//! use logservice::record::Level;
//!
//! let router = logservice::builder("app")
//!     .chain("stderr", |c| {
//!         c.levels(LevelRange::at_least(Level::Notice))
//!             .append(append::Stderr::default())
//!     })
//!     .chain("stdout", |c| {
//!         c.levels(LevelRange::between(Level::Debug, Level::Info))
//!             .append(append::Stdout::default())
//!     })
//!     .build()
//!     .unwrap();
//!
//! router.info("This is an info message.");
//! router.error("This is an error message.");
//! ```
//!
//! Assemble the standard policy from a configuration:
//!
//! ```
//! use logservice::config::Config;
//! use logservice::service::LogService;
//!
//! let service = LogService::builder(Config::default()).build().unwrap();
//! assert_eq!(service.router().chain_names(), vec!["stderr", "stdout"]);
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod bridge;
pub mod config;
pub mod exception;
pub mod filter;
pub mod handler;
pub mod layout;
pub mod processor;
pub mod record;
pub mod service;
pub mod trap;

pub use append::Append;
pub use exception::Exception;
pub use filter::Predicate;
pub use layout::Layout;
pub use record::Level;
pub use record::Record;

mod error;
pub use error::Error;

mod logger;
pub use logger::*;
