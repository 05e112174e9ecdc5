//! Protocol errors.
//!
//! Raised while encoding or decoding envelopes and while validating decoded
//! events. Decode errors keep the underlying parser message as a string so the
//! error stays `Clone` and comparable in tests.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced at the wire boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Envelope is not valid JSON, names an unknown event, or has a payload
    /// that does not match the event's schema.
    #[error("malformed envelope: {reason}")]
    Malformed {
        /// Parser message.
        reason: String,
    },

    /// Envelope could not be serialized.
    #[error("failed to encode {event}: {reason}")]
    Encode {
        /// Event name being encoded.
        event: &'static str,
        /// Serializer message.
        reason: String,
    },

    /// An identifier was empty.
    #[error("empty {kind} id")]
    EmptyId {
        /// Which identifier (`user`, `message`).
        kind: &'static str,
    },

    /// A message carried neither text nor images.
    #[error("message {id} has neither text nor images")]
    EmptyMessage {
        /// Offending message id.
        id: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed { reason: err.to_string() }
    }
}
