//! Coordinator events and actions.

use bookswap_proto::{Counterpart, Inbound, Intent, MessageId, Outbound, UserId};

/// Events the caller feeds into the coordinator.
///
/// The caller is responsible for:
/// - Decoding relay events and forwarding them
/// - Reporting the local identity once known
/// - Forwarding user intents (select, send, edit, delete, retry)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// Local user's identity became known.
    Identified {
        /// Local user
        user_id: UserId,
    },

    /// Event decoded from the relay.
    Relay(Inbound),

    /// User picked a conversation.
    Select(Counterpart),

    /// Chat was opened from a book listing.
    ///
    /// Buffered until identified. Ignored when the uploader is the local
    /// user.
    Preselect(NavigationContext),

    /// Reload a thread whose load failed.
    Retry,

    /// Send the composer draft to the selected counterpart.
    Send,

    /// Start editing one of the local user's messages.
    BeginEdit {
        /// Message to edit
        message_id: MessageId,
    },

    /// Submit the edited text.
    SaveEdit,

    /// Leave edit mode without saving.
    CancelEdit,

    /// Request deletion of one of the local user's messages.
    Delete {
        /// Message to delete
        message_id: MessageId,
    },
}

/// Actions the coordinator asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    /// Emit an event to the relay.
    Emit(Outbound),

    /// The relay refused a request that concerns the current view.
    Failed {
        /// Refused operation
        intent: Intent,
        /// Reason given by the relay
        reason: String,
    },
}

/// Uploader details carried when a chat is opened from a book listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationContext {
    /// Uploader's user id.
    pub uploader_id: UserId,
    /// Uploader's display name.
    pub uploader_name: String,
    /// Uploader's email.
    pub uploader_email: String,
}

impl NavigationContext {
    /// Directory entry for the uploader.
    pub fn counterpart(&self) -> Counterpart {
        Counterpart::new(self.uploader_id.clone(), &self.uploader_name, &self.uploader_email)
    }
}
