//! Typed routing for the observe topic.
//!
//! [`ObserveChannel`] wraps a [`ChannelSession`] joined to `"observe"` and
//! offers one registration method per catalog event. Each registration
//! decodes the raw payload before calling the handler; payloads that fail
//! to decode are reported to the [`EventLogger`] and skipped, so a single
//! bad event never disturbs the subscription.

use beacon_transport::{Payload, Transport};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::channel::{ChannelSession, ConnectError};
use crate::decode::{decode_messages, parse_payload, DecodeError};
use crate::entity::{Consumer, Message, Stream};
use crate::event::{ObserveEvent, ObserveUpdate};
use crate::logger::{EventLogger, TracingLogger};

/// Topic carrying stream, consumer and message change events.
pub const OBSERVE_TOPIC: &str = "observe";

/// Typed subscriber for the observe topic.
///
/// Handlers run on the session's dispatch task, one event at a time.
pub struct ObserveChannel {
    session: ChannelSession,
    logger: Arc<dyn EventLogger>,
}

impl ObserveChannel {
    /// Create an observe channel that reports decode failures via `tracing`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_logger(transport, Arc::new(TracingLogger))
    }

    /// Create an observe channel with a custom decode-failure logger.
    #[must_use]
    pub fn with_logger(transport: Arc<dyn Transport>, logger: Arc<dyn EventLogger>) -> Self {
        Self {
            session: ChannelSession::new(transport),
            logger,
        }
    }

    /// Join the observe topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot join or the channel is
    /// already connected.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        self.session.connect(OBSERVE_TOPIC).await
    }

    /// Leave the observe topic.
    pub async fn close(&self) {
        self.session.close().await;
    }

    /// The underlying raw session.
    #[must_use]
    pub fn session(&self) -> &ChannelSession {
        &self.session
    }

    /// Register the handler for `stream:created`.
    pub fn on_stream_created<F>(&self, handler: F)
    where
        F: Fn(Stream) + Send + Sync + 'static,
    {
        self.bind(ObserveEvent::StreamCreated, handler);
    }

    /// Register the handler for `stream:updated`.
    pub fn on_stream_updated<F>(&self, handler: F)
    where
        F: Fn(Stream) + Send + Sync + 'static,
    {
        self.bind(ObserveEvent::StreamUpdated, handler);
    }

    /// Register the handler for `stream:deleted`.
    pub fn on_stream_deleted<F>(&self, handler: F)
    where
        F: Fn(Stream) + Send + Sync + 'static,
    {
        self.bind(ObserveEvent::StreamDeleted, handler);
    }

    /// Register the handler for `consumer:created`.
    pub fn on_consumer_created<F>(&self, handler: F)
    where
        F: Fn(Consumer) + Send + Sync + 'static,
    {
        self.bind(ObserveEvent::ConsumerCreated, handler);
    }

    /// Register the handler for `consumer:updated`.
    pub fn on_consumer_updated<F>(&self, handler: F)
    where
        F: Fn(Consumer) + Send + Sync + 'static,
    {
        self.bind(ObserveEvent::ConsumerUpdated, handler);
    }

    /// Register the handler for `consumer:deleted`.
    pub fn on_consumer_deleted<F>(&self, handler: F)
    where
        F: Fn(Consumer) + Send + Sync + 'static,
    {
        self.bind(ObserveEvent::ConsumerDeleted, handler);
    }

    /// Register the handler for message batches.
    ///
    /// Batches without messages still reach the handler as an empty vec.
    pub fn on_messages_upserted<F>(&self, handler: F)
    where
        F: Fn(Vec<Message>) + Send + Sync + 'static,
    {
        self.bind_with(ObserveEvent::MessagesUpserted, decode_messages, handler);
    }

    /// Register one handler for every catalog event.
    ///
    /// Replaces any handler previously registered for those events.
    pub fn on_update<F>(&self, handler: F)
    where
        F: Fn(ObserveUpdate) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        for event in ObserveEvent::ALL {
            let handler = Arc::clone(&handler);
            self.bind_with(
                event,
                move |payload| ObserveUpdate::decode(event, payload),
                move |update| handler(update),
            );
        }
    }

    fn bind<T, F>(&self, event: ObserveEvent, handler: F)
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.bind_with(event, parse_payload::<T>, handler);
    }

    fn bind_with<T, D, F>(&self, event: ObserveEvent, decode: D, handler: F)
    where
        T: 'static,
        D: Fn(&Payload) -> Result<T, DecodeError> + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let logger = Arc::clone(&self.logger);
        self.session.on(event.name(), move |payload| match decode(payload) {
            Ok(value) => handler(value),
            Err(e) => logger.decode_failed(OBSERVE_TOPIC, event.name(), &e),
        });
    }
}
