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

//! Processors enrich records with `extra` values before they are dispatched.

use std::fmt;

use serde_json::Map;
use serde_json::Value;

use crate::record::Record;

/// A record processor.
///
/// The router runs every processor once per record, before any chain sees it.
pub trait Processor: fmt::Debug + Send + Sync + 'static {
    /// Append values to `extra` for `record`.
    fn process(&self, record: &Record, extra: &mut Map<String, Value>);
}

impl<T: Processor> From<T> for Box<dyn Processor> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// The parts of the active HTTP request that end up in log records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// The request URI, e.g. `/foo.php?id=1`.
    pub url: Option<String>,
    /// The client address.
    pub ip: Option<String>,
    /// The HTTP method.
    pub http_method: Option<String>,
    /// The server name.
    pub server: Option<String>,
    /// The `Referer` header.
    pub referrer: Option<String>,
}

impl RequestInfo {
    /// Describe a request by its URI.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the client address.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.http_method = Some(method.into());
        self
    }

    /// Set the server name.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Set the referrer.
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// The request path, i.e. the URI without query string.
    pub fn path(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(|url| url.split(['?', '#']).next().unwrap_or(url))
    }
}

/// Adds the URL, client IP, method, server and referrer of the active request to `extra`.
///
/// Only the fields that are known are added.
///
/// # Examples
///
/// ```
/// use logservice::processor::RequestInfo;
/// use logservice::processor::WebProcessor;
///
/// let processor = WebProcessor::new(RequestInfo::new("/foobar.php").with_ip("10.0.0.1"));
/// ```
#[derive(Debug, Clone)]
pub struct WebProcessor {
    request: RequestInfo,
}

impl WebProcessor {
    pub fn new(request: RequestInfo) -> Self {
        Self { request }
    }
}

impl Processor for WebProcessor {
    fn process(&self, _: &Record, extra: &mut Map<String, Value>) {
        let request = &self.request;
        for (key, value) in [
            ("url", &request.url),
            ("ip", &request.ip),
            ("http_method", &request.http_method),
            ("server", &request.server),
            ("referrer", &request.referrer),
        ] {
            if let Some(value) = value {
                extra.insert(key.to_string(), Value::from(value.as_str()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_processor_adds_known_fields() {
        let processor = WebProcessor::new(
            RequestInfo::new("/foobar.php")
                .with_ip("127.0.0.1")
                .with_method("GET"),
        );
        let mut extra = Map::new();
        processor.process(&Record::builder().build(), &mut extra);

        assert_eq!(extra["url"], "/foobar.php");
        assert_eq!(extra["ip"], "127.0.0.1");
        assert_eq!(extra["http_method"], "GET");
        assert!(!extra.contains_key("referrer"));
        assert!(!extra.contains_key("server"));
    }

    #[test]
    fn path_strips_query() {
        assert_eq!(RequestInfo::new("/api/items?page=2").path(), Some("/api/items"));
        assert_eq!(RequestInfo::default().path(), None);
    }
}
