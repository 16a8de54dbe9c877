//! # beacon-core
//!
//! Channel sessions and typed event routing for Beacon.
//!
//! - **Channel** - Joins one topic and dispatches raw events by name
//! - **Router** - Typed registrations for the observe topic
//! - **Decode** - Structural payload decoding into entities
//! - **Logger** - Injected sink for payloads that fail to decode
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Transport  │────▶│   Channel   │────▶│   Router    │────▶│   Handler   │
//! └─────────────┘     │  (raw, by   │     │ (decode by  │     └─────────────┘
//!                     │   name)     │     │   event)    │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use beacon_core::ObserveChannel;
//!
//! let channel = ObserveChannel::new(transport);
//! channel.on_stream_created(|stream| println!("new stream {}", stream.name));
//! channel.connect().await?;
//! ```

pub mod channel;
pub mod decode;
pub mod entity;
pub mod event;
pub mod logger;
pub mod router;

pub use channel::{ChannelSession, ConnectError, RawHandler};
pub use decode::{decode_messages, parse_payload, DecodeError};
pub use entity::{Consumer, Message, Stream, StreamStats};
pub use event::{ObserveEvent, ObserveUpdate};
pub use logger::{DecodeFailure, EventLogger, RecordingLogger, SilentLogger, TracingLogger};
pub use router::{ObserveChannel, OBSERVE_TOPIC};
