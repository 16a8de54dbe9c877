//! In-process transport.
//!
//! Events published on a [`MemoryTransport`] are handed straight to the
//! subscription of the joined topic. Used for embedding and for tests that
//! need a transport without a server.

use async_trait::async_trait;
use beacon_protocol::{codes, validate_topic};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::traits::{InboundEvent, Payload, Subscription, Transport, TransportError};

#[derive(Default)]
struct Inner {
    topics: DashMap<String, mpsc::UnboundedSender<InboundEvent>>,
    rejected: DashMap<String, String>,
    joins: AtomicUsize,
}

/// A transport that lives entirely in memory.
///
/// Cloning yields another handle to the same transport.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse future joins of `topic` with the given reason.
    pub fn reject(&self, topic: impl Into<String>, reason: impl Into<String>) {
        self.inner.rejected.insert(topic.into(), reason.into());
    }

    /// Deliver an event to the subscriber of `topic`.
    ///
    /// Returns `false` if nobody has joined the topic.
    pub fn publish(&self, topic: &str, event: impl Into<String>, payload: Payload) -> bool {
        let event = event.into();
        let delivered = self
            .inner
            .topics
            .get(topic)
            .map(|tx| tx.send(InboundEvent::new(topic, event.clone(), payload)).is_ok())
            .unwrap_or(false);

        if !delivered {
            trace!(topic = %topic, event = %event, "No subscriber for event");
        }
        delivered
    }

    /// Check if a topic is currently joined.
    #[must_use]
    pub fn is_joined(&self, topic: &str) -> bool {
        self.inner.topics.contains_key(topic)
    }

    /// Total number of successful joins since creation.
    #[must_use]
    pub fn join_count(&self) -> usize {
        self.inner.joins.load(Ordering::Relaxed)
    }

    /// Drop every subscription, as if the connection went away.
    pub fn disconnect(&self) {
        self.inner.topics.clear();
        debug!("Memory transport disconnected");
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn join(&self, topic: &str) -> Result<Box<dyn Subscription>, TransportError> {
        validate_topic(topic).map_err(TransportError::InvalidTopic)?;

        if let Some(reason) = self.inner.rejected.get(topic) {
            return Err(TransportError::JoinRejected {
                topic: topic.to_string(),
                code: codes::JOIN_REJECTED,
                message: reason.clone(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        match self.inner.topics.entry(topic.to_string()) {
            Entry::Occupied(_) => return Err(TransportError::AlreadyJoined(topic.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }
        self.inner.joins.fetch_add(1, Ordering::Relaxed);
        debug!(topic = %topic, "Joined memory topic");

        Ok(Box::new(MemorySubscription {
            topic: topic.to_string(),
            events: rx,
            inner: Arc::clone(&self.inner),
            joined: true,
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Subscription handed out by [`MemoryTransport`].
pub struct MemorySubscription {
    topic: String,
    events: mpsc::UnboundedReceiver<InboundEvent>,
    inner: Arc<Inner>,
    joined: bool,
}

impl MemorySubscription {
    fn detach(&mut self) {
        if std::mem::take(&mut self.joined) {
            self.inner.topics.remove(&self.topic);
            self.events.close();
        }
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn recv(&mut self) -> Result<Option<InboundEvent>, TransportError> {
        Ok(self.events.recv().await)
    }

    async fn leave(&mut self) -> Result<(), TransportError> {
        self.detach();
        debug!(topic = %self.topic, "Left memory topic");
        Ok(())
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        self.detach();
    }
}
