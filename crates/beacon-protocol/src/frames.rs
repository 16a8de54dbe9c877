//! Frame types for the Beacon protocol.
//!
//! A client opens one connection, performs the `connect` handshake and then
//! joins any number of topics over it. Everything the server pushes for a
//! joined topic arrives as an `event` frame carrying an event name and an
//! untyped payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum FrameType {
    Join = 0x01,
    Leave = 0x02,
    Event = 0x03,
    Ack = 0x05,
    Error = 0x06,
    Ping = 0x07,
    Pong = 0x08,
    Connect = 0x09,
    Connected = 0x0A,
}

impl From<FrameType> for u8 {
    fn from(ft: FrameType) -> u8 {
        ft as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        match value {
            0x01 => Ok(FrameType::Join),
            0x02 => Ok(FrameType::Leave),
            0x03 => Ok(FrameType::Event),
            0x05 => Ok(FrameType::Ack),
            0x06 => Ok(FrameType::Error),
            0x07 => Ok(FrameType::Ping),
            0x08 => Ok(FrameType::Pong),
            0x09 => Ok(FrameType::Connect),
            0x0A => Ok(FrameType::Connected),
            _ => Err("Invalid frame type"),
        }
    }
}

/// Error codes carried by `error` frames.
pub mod codes {
    /// The join request was refused by the server.
    pub const JOIN_REJECTED: u16 = 1002;
    /// The topic name failed validation.
    pub const INVALID_TOPIC: u16 = 1003;
    /// The client is not authorized for the topic.
    pub const UNAUTHORIZED: u16 = 1004;
    /// Leave for a topic the client never joined.
    pub const NOT_JOINED: u16 = 1008;
}

/// A protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// Join a topic.
    #[serde(rename = "join")]
    Join {
        /// Request ID, echoed by the `ack` or `error` reply.
        id: u64,
        /// Topic to join.
        topic: String,
    },

    /// Leave a topic.
    #[serde(rename = "leave")]
    Leave {
        /// Request ID.
        id: u64,
        /// Topic to leave.
        topic: String,
    },

    /// A named event pushed on a joined topic.
    #[serde(rename = "event")]
    Event {
        /// Topic the event belongs to.
        topic: String,
        /// Event name, e.g. `stream:created`.
        event: String,
        /// Untyped event payload.
        #[serde(default)]
        payload: Value,
    },

    /// Acknowledgment of a request.
    #[serde(rename = "ack")]
    Ack {
        /// ID of the acknowledged request.
        id: u64,
    },

    /// Error response.
    #[serde(rename = "error")]
    Error {
        /// ID of the failed request (0 if not applicable).
        id: u64,
        /// Error code, see [`codes`].
        code: u16,
        /// Human-readable error message.
        message: String,
    },

    /// Keepalive ping.
    #[serde(rename = "ping")]
    Ping {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },

    /// Keepalive pong.
    #[serde(rename = "pong")]
    Pong {
        /// Echoed timestamp from ping.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },

    /// Initial connection handshake.
    #[serde(rename = "connect")]
    Connect {
        /// Protocol major version.
        version: u8,
        /// Optional authentication token.
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },

    /// Connection established response.
    #[serde(rename = "connected")]
    Connected {
        /// Unique connection identifier.
        connection_id: String,
        /// Negotiated protocol major version.
        version: u8,
        /// Recommended heartbeat interval in milliseconds.
        heartbeat: u32,
    },
}

impl Frame {
    /// Get the frame type.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Join { .. } => FrameType::Join,
            Frame::Leave { .. } => FrameType::Leave,
            Frame::Event { .. } => FrameType::Event,
            Frame::Ack { .. } => FrameType::Ack,
            Frame::Error { .. } => FrameType::Error,
            Frame::Ping { .. } => FrameType::Ping,
            Frame::Pong { .. } => FrameType::Pong,
            Frame::Connect { .. } => FrameType::Connect,
            Frame::Connected { .. } => FrameType::Connected,
        }
    }

    /// Request ID a reply frame refers to.
    #[must_use]
    pub fn reply_id(&self) -> Option<u64> {
        match self {
            Frame::Ack { id } | Frame::Error { id, .. } => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn join(id: u64, topic: impl Into<String>) -> Self {
        Frame::Join {
            id,
            topic: topic.into(),
        }
    }

    #[must_use]
    pub fn leave(id: u64, topic: impl Into<String>) -> Self {
        Frame::Leave {
            id,
            topic: topic.into(),
        }
    }

    /// Create a new Event frame.
    #[must_use]
    pub fn event(topic: impl Into<String>, event: impl Into<String>, payload: Value) -> Self {
        Frame::Event {
            topic: topic.into(),
            event: event.into(),
            payload,
        }
    }

    #[must_use]
    pub fn ack(id: u64) -> Self {
        Frame::Ack { id }
    }

    /// Create a new Error frame.
    #[must_use]
    pub fn error(id: u64, code: u16, message: impl Into<String>) -> Self {
        Frame::Error {
            id,
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn ping() -> Self {
        Frame::Ping { timestamp: None }
    }

    #[must_use]
    pub fn pong(timestamp: Option<u64>) -> Self {
        Frame::Pong { timestamp }
    }

    /// Create a new Connect frame.
    #[must_use]
    pub fn connect(version: u8, token: Option<String>) -> Self {
        Frame::Connect { version, token }
    }

    /// Create a new Connected frame.
    #[must_use]
    pub fn connected(connection_id: impl Into<String>, version: u8, heartbeat: u32) -> Self {
        Frame::Connected {
            connection_id: connection_id.into(),
            version,
            heartbeat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_type() {
        let join = Frame::join(1, "observe");
        assert_eq!(join.frame_type(), FrameType::Join);

        let event = Frame::event("observe", "stream:created", json!({"id": "s1"}));
        assert_eq!(event.frame_type(), FrameType::Event);
    }

    #[test]
    fn test_reply_id() {
        assert_eq!(Frame::ack(7).reply_id(), Some(7));
        assert_eq!(Frame::error(9, codes::JOIN_REJECTED, "no").reply_id(), Some(9));
        assert_eq!(Frame::join(3, "observe").reply_id(), None);
    }

    #[test]
    fn test_frame_type_conversion() {
        assert_eq!(FrameType::try_from(0x03), Ok(FrameType::Event));
        assert_eq!(u8::from(FrameType::Connected), 0x0A);
        assert!(FrameType::try_from(0x04).is_err());
    }

    #[test]
    fn test_event_json_shape() {
        let frame = Frame::event("observe", "messages:upserted", json!({"messages": []}));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["event"], "messages:upserted");
        assert_eq!(value["payload"]["messages"], json!([]));
    }
}
