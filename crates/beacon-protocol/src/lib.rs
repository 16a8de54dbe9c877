//! # beacon-protocol
//!
//! Wire protocol for Beacon event channels.
//!
//! A client connects once, then joins topics over that connection. The
//! server pushes named events on joined topics; each event carries an
//! untyped JSON-like payload that higher layers decode.
//!
//! ## Frame Types
//!
//! - `Connect` / `Connected` - Handshake and version negotiation
//! - `Join` / `Leave` - Topic membership
//! - `Event` - Named event with payload on a topic
//! - `Ack` / `Error` - Replies to requests
//! - `Ping` / `Pong` - Keepalive
//!
//! ## Example
//!
//! ```rust
//! use beacon_protocol::{codec, Frame};
//! use serde_json::json;
//!
//! let frame = Frame::event("observe", "stream:created", json!({"id": "s1"}));
//!
//! let encoded = codec::encode(&frame).unwrap();
//! let decoded = codec::decode(&encoded).unwrap();
//! assert_eq!(frame, decoded);
//! ```

pub mod codec;
pub mod frames;
pub mod topic;
pub mod version;

pub use codec::{decode, encode, ProtocolError};
pub use frames::{codes, Frame, FrameType};
pub use topic::{validate_topic, MAX_TOPIC_LENGTH};
pub use version::{accepts_major, PROTOCOL_MAJOR};
