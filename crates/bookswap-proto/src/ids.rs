//! Identifiers.
//!
//! User and message ids are opaque strings assigned by the relay. They are
//! never interpreted client-side, only compared. Empty ids are rejected when
//! constructed or decoded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an id, rejecting the empty string.
            pub fn new(id: impl Into<String>) -> Result<Self, ProtocolError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ProtocolError::EmptyId { kind: $kind });
                }
                Ok(Self(id))
            }

            /// Id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ProtocolError;

            fn try_from(id: String) -> Result<Self, Self::Error> {
                Self::new(id)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ProtocolError;

            fn try_from(id: &str) -> Result<Self, Self::Error> {
                Self::new(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identity of a marketplace user (the local user or a counterpart).
    UserId,
    "user"
);

opaque_id!(
    /// Identity of a message, assigned by the relay on acknowledgement.
    MessageId,
    "message"
);

/// Correlates a `getMessages` request with the `messagesList` answering it.
///
/// Tokens are issued in increasing order per session, so a later request
/// always carries a larger token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(pub u64);

impl RequestToken {
    /// Token following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
