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

//! Publishing log records to a message-queue exchange.
//!
//! The queue client itself is not part of this crate: implement [`Exchange`] over the client's
//! publish call and hand it to a [`QueuePublisher`].

use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;

use crate::Error;
use crate::append::Append;
use crate::layout::JsonLayout;
use crate::layout::Layout;
use crate::record::Level;
use crate::record::Record;

/// Properties attached to every published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProperties {
    /// The publishing application.
    pub app_id: String,
    /// The message type, fixed per deployment.
    pub message_type: String,
    /// The content type of the body.
    pub content_type: &'static str,
    /// The time the record was observed.
    pub timestamp: Timestamp,
}

/// A message-queue exchange that accepts published messages.
pub trait Exchange: fmt::Debug + Send + Sync + 'static {
    /// Publish `body` with the given routing key and properties.
    fn publish(
        &self,
        routing_key: &str,
        properties: &MessageProperties,
        body: &[u8],
    ) -> Result<(), Error>;
}

impl<T: Exchange + ?Sized> Exchange for Arc<T> {
    fn publish(
        &self,
        routing_key: &str,
        properties: &MessageProperties,
        body: &[u8],
    ) -> Result<(), Error> {
        (**self).publish(routing_key, properties, body)
    }
}

/// An appender that publishes records at or above a minimum level to an [`Exchange`].
///
/// The routing key defaults to `<app_id>.log.error`, the message type to `error`, and the minimum
/// level to `NOTICE`. Bodies are formatted with [`JsonLayout`] unless configured otherwise.
///
/// # Examples
///
/// ```
/// use logservice::Error;
/// use logservice::append::QueuePublisher;
/// use logservice::append::queue::Exchange;
/// use logservice::append::queue::MessageProperties;
///
/// #[derive(Debug)]
/// struct Discard;
///
/// impl Exchange for Discard {
///     fn publish(&self, _: &str, _: &MessageProperties, _: &[u8]) -> Result<(), Error> {
///         Ok(())
///     }
/// }
///
/// let publisher = QueuePublisher::new(Discard, "billing");
/// assert_eq!(publisher.routing_key(), "billing.log.error");
/// ```
#[derive(Debug)]
pub struct QueuePublisher {
    exchange: Box<dyn Exchange>,
    app_id: String,
    routing_key: String,
    message_type: String,
    min_level: Level,
    layout: Box<dyn Layout>,
}

impl QueuePublisher {
    /// Create a publisher for the given exchange and application id.
    pub fn new(exchange: impl Exchange, app_id: impl Into<String>) -> Self {
        let app_id = app_id.into();
        Self {
            exchange: Box::new(exchange),
            routing_key: format!("{app_id}.log.error"),
            app_id,
            message_type: "error".to_string(),
            min_level: Level::Notice,
            layout: Box::new(JsonLayout::default()),
        }
    }

    /// Set the routing key.
    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    /// Set the message type.
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = message_type.into();
        self
    }

    /// Set the minimum level to publish.
    pub fn with_min_level(mut self, min_level: Level) -> Self {
        self.min_level = min_level;
        self
    }

    /// Set the layout for message bodies.
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// The routing key used for every message.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }
}

impl Append for QueuePublisher {
    fn append(&self, record: &Record) -> Result<(), Error> {
        if record.level() < self.min_level {
            return Ok(());
        }

        let body = self.layout.format(record)?;
        let properties = MessageProperties {
            app_id: self.app_id.clone(),
            message_type: self.message_type.clone(),
            content_type: "application/json",
            timestamp: record.time(),
        };
        self.exchange
            .publish(&self.routing_key, &properties, &body)
            .map_err(|err| {
                Error::new("failed to publish log record")
                    .with_context("routing_key", &self.routing_key)
                    .with_source(err)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::Value;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        published: Mutex<Vec<(String, MessageProperties, Value)>>,
    }

    impl Exchange for Recorder {
        fn publish(
            &self,
            routing_key: &str,
            properties: &MessageProperties,
            body: &[u8],
        ) -> Result<(), Error> {
            let body = serde_json::from_slice(body)?;
            self.published.lock().unwrap().push((
                routing_key.to_string(),
                properties.clone(),
                body,
            ));
            Ok(())
        }
    }

    #[test]
    fn publishes_at_or_above_min_level() {
        let recorder = Arc::new(Recorder::default());
        let publisher = QueuePublisher::new(recorder.clone(), "billing");

        for (level, message) in [
            (Level::Info, "this is info"),
            (Level::Notice, "this is a notice"),
            (Level::Critical, "this is critical"),
        ] {
            let record = Record::builder().level(level).message(message).build();
            publisher.append(&record).unwrap();
        }

        let published = recorder.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        let (routing_key, properties, body) = &published[0];
        assert_eq!(routing_key, "billing.log.error");
        assert_eq!(properties.app_id, "billing");
        assert_eq!(properties.message_type, "error");
        assert_eq!(properties.content_type, "application/json");
        assert_eq!(body["message"], "this is a notice");
        assert_eq!(published[1].2["level_name"], "CRITICAL");
    }

    #[test]
    fn publish_failure_carries_routing_key() {
        #[derive(Debug)]
        struct Down;

        impl Exchange for Down {
            fn publish(&self, _: &str, _: &MessageProperties, _: &[u8]) -> Result<(), Error> {
                Err(Error::new("connection refused"))
            }
        }

        let publisher = QueuePublisher::new(Down, "billing").with_routing_key("ops.errors");
        let record = Record::builder().level(Level::Error).build();
        let err = publisher.append(&record).unwrap_err();
        assert_eq!(err.context("routing_key"), Some("ops.errors"));
    }
}
