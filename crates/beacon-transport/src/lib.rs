//! # beacon-transport
//!
//! Transport abstraction layer for Beacon event channels.
//!
//! - **WebSocket** - Client connection to a Beacon server, many topics per socket
//! - **Memory** - In-process transport for embedding and tests
//!
//! ## Transport Abstraction
//!
//! Every transport implements [`Transport`]; joining a topic yields a
//! [`Subscription`] that produces that topic's events in arrival order.
//!
//! ```rust,ignore
//! use beacon_transport::{Transport, WebSocketConfig, WebSocketTransport};
//!
//! let transport = WebSocketTransport::connect(WebSocketConfig::default()).await?;
//! let mut sub = transport.join("observe").await?;
//! while let Some(event) = sub.recv().await? {
//!     println!("{} {}", event.event, event.payload);
//! }
//! ```

pub mod memory;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use memory::MemoryTransport;
pub use traits::{ConnectionId, InboundEvent, Payload, Subscription, Transport, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketTransport};
