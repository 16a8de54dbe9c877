//! Entities carried by observe events.
//!
//! Decoding is structural: unknown keys are ignored, and missing keys or
//! keys set to `null` take their default value, so older and newer servers
//! can both be observed. A key holding a value of the wrong type fails the
//! whole decode.

use serde::{Deserialize, Serialize};

use crate::decode::null_as_default;

/// A stream of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stream {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub account_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stats: StreamStats,
    /// RFC 3339 timestamp as sent by the server.
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Counters reported alongside a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamStats {
    #[serde(deserialize_with = "null_as_default")]
    pub consumer_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub message_count: u64,
    /// Bytes on disk.
    #[serde(deserialize_with = "null_as_default")]
    pub storage_size: u64,
}

/// A consumer reading from a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consumer {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stream_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub account_id: String,
    /// `pull` or `push`.
    #[serde(deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub filter_key_pattern: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ack_wait_ms: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_ack_pending: u64,
    pub max_deliver: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub max_waiting: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A message stored in a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stream_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub seq: u64,
    pub data: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}
