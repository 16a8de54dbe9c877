//! The observe event catalog.
//!
//! Every event the observe topic carries is a variant of [`ObserveEvent`];
//! [`ObserveUpdate`] is the same set with the decoded payload attached.

use beacon_transport::Payload;
use std::fmt;

use crate::decode::{decode_messages, parse_payload, DecodeError};
use crate::entity::{Consumer, Message, Stream};

/// Events published on the observe topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserveEvent {
    StreamCreated,
    StreamUpdated,
    StreamDeleted,
    ConsumerCreated,
    ConsumerUpdated,
    ConsumerDeleted,
    MessagesUpserted,
}

impl ObserveEvent {
    /// Every catalog event.
    pub const ALL: [ObserveEvent; 7] = [
        ObserveEvent::StreamCreated,
        ObserveEvent::StreamUpdated,
        ObserveEvent::StreamDeleted,
        ObserveEvent::ConsumerCreated,
        ObserveEvent::ConsumerUpdated,
        ObserveEvent::ConsumerDeleted,
        ObserveEvent::MessagesUpserted,
    ];

    /// Event name on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ObserveEvent::StreamCreated => "stream:created",
            ObserveEvent::StreamUpdated => "stream:updated",
            ObserveEvent::StreamDeleted => "stream:deleted",
            ObserveEvent::ConsumerCreated => "consumer:created",
            ObserveEvent::ConsumerUpdated => "consumer:updated",
            ObserveEvent::ConsumerDeleted => "consumer:deleted",
            ObserveEvent::MessagesUpserted => "messages:upserted",
        }
    }

    /// Look up a catalog event by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }
}

impl fmt::Display for ObserveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A decoded observe event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserveUpdate {
    StreamCreated(Stream),
    StreamUpdated(Stream),
    StreamDeleted(Stream),
    ConsumerCreated(Consumer),
    ConsumerUpdated(Consumer),
    ConsumerDeleted(Consumer),
    MessagesUpserted(Vec<Message>),
}

impl ObserveUpdate {
    /// Decode the payload of `event` into its typed form.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not match the event's shape.
    pub fn decode(event: ObserveEvent, payload: &Payload) -> Result<Self, DecodeError> {
        Ok(match event {
            ObserveEvent::StreamCreated => Self::StreamCreated(parse_payload(payload)?),
            ObserveEvent::StreamUpdated => Self::StreamUpdated(parse_payload(payload)?),
            ObserveEvent::StreamDeleted => Self::StreamDeleted(parse_payload(payload)?),
            ObserveEvent::ConsumerCreated => Self::ConsumerCreated(parse_payload(payload)?),
            ObserveEvent::ConsumerUpdated => Self::ConsumerUpdated(parse_payload(payload)?),
            ObserveEvent::ConsumerDeleted => Self::ConsumerDeleted(parse_payload(payload)?),
            ObserveEvent::MessagesUpserted => Self::MessagesUpserted(decode_messages(payload)?),
        })
    }

    /// The catalog event this update was decoded from.
    #[must_use]
    pub fn event(&self) -> ObserveEvent {
        match self {
            Self::StreamCreated(_) => ObserveEvent::StreamCreated,
            Self::StreamUpdated(_) => ObserveEvent::StreamUpdated,
            Self::StreamDeleted(_) => ObserveEvent::StreamDeleted,
            Self::ConsumerCreated(_) => ObserveEvent::ConsumerCreated,
            Self::ConsumerUpdated(_) => ObserveEvent::ConsumerUpdated,
            Self::ConsumerDeleted(_) => ObserveEvent::ConsumerDeleted,
            Self::MessagesUpserted(_) => ObserveEvent::MessagesUpserted,
        }
    }
}
