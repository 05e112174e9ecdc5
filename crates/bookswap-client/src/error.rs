//! Errors returned when a user command cannot be applied.
//!
//! Relay events never fail: stale or unrelated events are dropped. Only
//! commands issued by the local user produce a [`ClientError`], and none of
//! them leave partial state behind.

use bookswap_proto::MessageId;
use thiserror::Error;

/// Reasons a user command was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The local user's id is not known yet.
    #[error("not identified")]
    NotIdentified,

    /// The command needs a selected conversation.
    #[error("no conversation selected")]
    NoSelection,

    /// Draft has neither text nor images.
    #[error("nothing to send")]
    EmptyDraft,

    /// A normal send was attempted while editing a message.
    #[error("finish or cancel the edit first")]
    EditInProgress,

    /// Message is not in the displayed thread.
    #[error("message {message_id} not found")]
    MessageNotFound {
        /// Requested message
        message_id: MessageId,
    },

    /// Message was written by someone else.
    #[error("message {message_id} was not sent by you")]
    NotOwnMessage {
        /// Requested message
        message_id: MessageId,
    },

    /// Image-only messages have no text to edit.
    #[error("message {message_id} has no text to edit")]
    NotEditable {
        /// Requested message
        message_id: MessageId,
    },

    /// Save or cancel without an active edit.
    #[error("not editing a message")]
    NotEditing,

    /// Edited text is blank. The edit stays open.
    #[error("edited text cannot be empty")]
    EmptyEdit,

    /// Retry is only possible after a failed load.
    #[error("nothing to retry")]
    NothingToRetry,
}

impl ClientError {
    /// Errors the UI should swallow instead of reporting.
    ///
    /// Pressing send on an empty composer is a no-op, not a mistake.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::EmptyDraft)
    }
}
