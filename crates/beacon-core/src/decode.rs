//! Payload decoding.
//!
//! Payloads arrive as untyped JSON trees. Decoding into a typed shape is a
//! single fallible step; a failed decode produces nothing.

use beacon_transport::Payload;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::entity::Message;

/// A payload did not match the expected shape.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DecodeError(#[from] serde_json::Error);

impl DecodeError {
    /// The underlying serde error.
    #[must_use]
    pub fn source_error(&self) -> &serde_json::Error {
        &self.0
    }
}

/// Decode a payload into `T`.
///
/// # Errors
///
/// Returns an error if a field has an incompatible type or the payload is
/// not an object.
pub fn parse_payload<T: DeserializeOwned>(payload: &Payload) -> Result<T, DecodeError> {
    Ok(T::deserialize(payload)?)
}

/// Wire shape of a message batch.
#[derive(Debug, Default, Deserialize)]
struct MessageBatch {
    #[serde(default, deserialize_with = "null_as_default")]
    messages: Vec<Message>,
}

/// Deserialize a field, reading an explicit `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode the `messages` list of a batch payload.
///
/// An absent or `null` list yields an empty batch.
///
/// # Errors
///
/// Returns an error if the payload is not an object or any message in the
/// list fails to decode.
pub fn decode_messages(payload: &Payload) -> Result<Vec<Message>, DecodeError> {
    parse_payload::<MessageBatch>(payload).map(|batch| batch.messages)
}
