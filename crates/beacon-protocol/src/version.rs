//! Protocol versioning.
//!
//! Only the major version travels in `connect`/`connected` frames; a peer
//! speaking a different major is refused during the handshake.

/// Major protocol version spoken by this crate.
pub const PROTOCOL_MAJOR: u8 = 1;

/// Check a major version announced by the peer.
#[must_use]
pub const fn accepts_major(major: u8) -> bool {
    major == PROTOCOL_MAJOR
}
