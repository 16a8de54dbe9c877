//! Transport abstraction traits for Beacon.
//!
//! A transport owns the network connection and topic multiplexing. Callers
//! only ever see one [`Subscription`] per joined topic, yielding events in
//! the order the transport received them.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Untyped event payload as delivered by a transport.
pub type Payload = serde_json::Value;

/// Connection identifier assigned by the server during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named event received on a joined topic.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Topic the event arrived on.
    pub topic: String,
    /// Event name, e.g. `consumer:updated`.
    pub event: String,
    /// Payload exactly as received.
    pub payload: Payload,
}

impl InboundEvent {
    #[must_use]
    pub fn new(topic: impl Into<String>, event: impl Into<String>, payload: Payload) -> Self {
        Self {
            topic: topic.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Waiting for the peer timed out.
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// The server refused to join the topic.
    #[error("Join rejected for topic '{topic}': {message} (code {code})")]
    JoinRejected {
        /// Topic that was refused.
        topic: String,
        /// Server error code.
        code: u16,
        /// Server explanation.
        message: String,
    },

    /// The topic is already joined on this transport.
    #[error("Topic already joined: {0}")]
    AlreadyJoined(String),

    /// Invalid topic name.
    #[error("Invalid topic: {0}")]
    InvalidTopic(&'static str),

    /// The server speaks an incompatible protocol version.
    #[error("Incompatible protocol version {0}")]
    IncompatibleVersion(u8),

    /// Connection handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] beacon_protocol::ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A connection that can join topics.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Join a topic and start receiving its events.
    ///
    /// Resolves once the join handshake completed. Events that arrive after
    /// the server accepted the join are buffered in the returned
    /// subscription until read.
    async fn join(&self, topic: &str) -> Result<Box<dyn Subscription>, TransportError>;

    /// Get the transport name (e.g., "websocket", "memory").
    fn name(&self) -> &'static str;

    /// Check if the transport is healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Membership of a single joined topic.
#[async_trait]
pub trait Subscription: Send {
    /// The joined topic.
    fn topic(&self) -> &str;

    /// Receive the next event on the topic.
    ///
    /// Returns `None` once the topic was left or the connection closed.
    async fn recv(&mut self) -> Result<Option<InboundEvent>, TransportError>;

    /// Leave the topic. Leaving twice is a no-op.
    async fn leave(&mut self) -> Result<(), TransportError>;
}
