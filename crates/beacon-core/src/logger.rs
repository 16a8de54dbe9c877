//! Reporting of payloads that failed to decode.
//!
//! Routers take an [`EventLogger`] at construction instead of logging
//! through a global, so embedders can silence, capture or count failures.

use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::decode::DecodeError;

/// Sink for decode failures. Never affects dispatch.
pub trait EventLogger: Send + Sync {
    /// A payload for `event` on `topic` could not be decoded and was skipped.
    fn decode_failed(&self, topic: &str, event: &str, error: &DecodeError);
}

/// Reports failures as `tracing` warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl EventLogger for TracingLogger {
    fn decode_failed(&self, topic: &str, event: &str, error: &DecodeError) {
        warn!(topic = %topic, event = %event, error = %error, "Error parsing {} payload", event);
    }
}

/// Drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentLogger;

impl EventLogger for SilentLogger {
    fn decode_failed(&self, _topic: &str, _event: &str, _error: &DecodeError) {}
}

/// One recorded decode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub topic: String,
    pub event: String,
    pub error: String,
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    failures: Mutex<Vec<DecodeFailure>>,
}

impl RecordingLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the failures recorded so far, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<DecodeFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl EventLogger for RecordingLogger {
    fn decode_failed(&self, topic: &str, event: &str, error: &DecodeError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DecodeFailure {
                topic: topic.to_string(),
                event: event.to_string(),
                error: error.to_string(),
            });
    }
}
