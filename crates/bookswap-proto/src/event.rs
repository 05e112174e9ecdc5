//! Relay events and the JSON envelope codec.
//!
//! Both directions use adjacently tagged envelopes: the `event` field names
//! the variant and `data` holds its payload. Event names are the relay's
//! vocabulary, so the Rust variant names describe intent while the wire keeps
//! the names the relay already understands.
//!
//! # Invariants
//!
//! - Each variant maps to exactly one event name (enforced by the serde
//!   attributes and checked by [`Outbound::name`] / [`Inbound::name`]).
//! - [`Inbound::decode`] only returns events that passed
//!   [`Inbound::validate`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    ids::{MessageId, RequestToken, UserId},
    model::{Counterpart, ImageRef, Message},
};

/// Intents the client sends to the relay.
///
/// Fire-and-forget: success is only observed through the matching
/// [`Inbound`] event, failure through [`Inbound::RequestFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Outbound {
    /// Mark the local user as online.
    #[serde(rename = "addUser")]
    AnnouncePresence(UserId),

    /// Ask for the conversation directory of the local user.
    #[serde(rename = "getChatUsers")]
    RequestDirectory(UserId),

    /// Ask for the full thread between the local user and a counterpart.
    #[serde(rename = "getMessages")]
    RequestThread {
        /// Local user.
        #[serde(rename = "currentUserId")]
        self_id: UserId,
        /// Counterpart whose thread is requested.
        #[serde(rename = "selectedUserId")]
        counterpart_id: UserId,
        /// Echoed by the answering `messagesList`.
        #[serde(rename = "requestId")]
        request_id: RequestToken,
    },

    /// Send a new message.
    #[serde(rename = "sendMessage")]
    SendMessage {
        /// Local user.
        #[serde(rename = "senderId")]
        sender_id: UserId,
        /// Counterpart.
        #[serde(rename = "receiverId")]
        receiver_id: UserId,
        /// Text body, omitted for image-only messages.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Image references, omitted when empty.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        images: Vec<ImageRef>,
    },

    /// Replace the text of one of the local user's messages.
    #[serde(rename = "updateMessage")]
    EditMessage {
        /// Message being edited.
        #[serde(rename = "messageId")]
        message_id: MessageId,
        /// Replacement text.
        #[serde(rename = "newText")]
        new_text: String,
        /// Local user.
        #[serde(rename = "currentUserId")]
        self_id: UserId,
        /// Counterpart of the thread.
        #[serde(rename = "selectedUserId")]
        counterpart_id: UserId,
    },

    /// Delete one of the local user's messages.
    #[serde(rename = "deleteMessage")]
    DeleteMessage {
        /// Message being deleted.
        #[serde(rename = "messageId")]
        message_id: MessageId,
        /// Local user.
        #[serde(rename = "currentUserId")]
        self_id: UserId,
        /// Counterpart of the thread.
        #[serde(rename = "selectedUserId")]
        counterpart_id: UserId,
    },
}

impl Outbound {
    /// Wire event name.
    pub const fn name(&self) -> &'static str {
        self.intent().name()
    }

    /// Intent this event expresses.
    pub const fn intent(&self) -> Intent {
        match self {
            Self::AnnouncePresence(_) => Intent::AnnouncePresence,
            Self::RequestDirectory(_) => Intent::RequestDirectory,
            Self::RequestThread { .. } => Intent::RequestThread,
            Self::SendMessage { .. } => Intent::SendMessage,
            Self::EditMessage { .. } => Intent::EditMessage,
            Self::DeleteMessage { .. } => Intent::DeleteMessage,
        }
    }

    /// Encode as a JSON envelope.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ProtocolError::Encode { event: self.name(), reason: e.to_string() })
    }

    /// Decode a JSON envelope sent by a client. Used by relays and tests.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Snapshots and notifications pushed by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Inbound {
    /// Complete set of online user ids.
    #[serde(rename = "getOnlineUsers")]
    PresenceSnapshot(Vec<UserId>),

    /// Complete conversation directory, in display order.
    #[serde(rename = "chatUsersList")]
    DirectorySnapshot(Vec<Counterpart>),

    /// Complete thread answering a `getMessages` request.
    #[serde(rename = "messagesList")]
    ThreadSnapshot(ThreadSnapshot),

    /// A message was accepted by the relay (sent by either side).
    #[serde(rename = "receiveMessage")]
    MessageReceived(Message),

    /// A message's text was edited.
    #[serde(rename = "messageUpdated")]
    MessageUpdated(Message),

    /// A message was deleted.
    #[serde(rename = "messageDeleted")]
    MessageDeleted {
        /// Deleted message.
        #[serde(rename = "messageId")]
        message_id: MessageId,
    },

    /// The relay rejected or failed an outbound intent.
    #[serde(rename = "requestFailed")]
    RequestFailed(RequestFailure),
}

impl Inbound {
    /// Wire event name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PresenceSnapshot(_) => "getOnlineUsers",
            Self::DirectorySnapshot(_) => "chatUsersList",
            Self::ThreadSnapshot(_) => "messagesList",
            Self::MessageReceived(_) => "receiveMessage",
            Self::MessageUpdated(_) => "messageUpdated",
            Self::MessageDeleted { .. } => "messageDeleted",
            Self::RequestFailed(_) => "requestFailed",
        }
    }

    /// Decode and validate a JSON envelope from the relay.
    pub fn decode(text: &str) -> Result<Self> {
        let event: Self = serde_json::from_str(text)?;
        event.validate()?;
        Ok(event)
    }

    /// Encode as a JSON envelope. Used by relays and tests.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ProtocolError::Encode { event: self.name(), reason: e.to_string() })
    }

    /// Check that every carried message satisfies the content invariant.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::ThreadSnapshot(snapshot) => {
                snapshot.messages.iter().try_for_each(Message::validate)
            },
            Self::MessageReceived(message) | Self::MessageUpdated(message) => message.validate(),
            Self::PresenceSnapshot(_)
            | Self::DirectorySnapshot(_)
            | Self::MessageDeleted { .. }
            | Self::RequestFailed(_) => Ok(()),
        }
    }
}

/// Thread payload, optionally correlated with the request it answers.
///
/// Relays that predate correlation send a bare message array; those decode
/// with `request_id: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ThreadSnapshotRepr", into = "ThreadSnapshotRepr")]
pub struct ThreadSnapshot {
    /// Token of the answered `getMessages`, if the relay echoes it.
    pub request_id: Option<RequestToken>,
    /// Messages in display order.
    pub messages: Vec<Message>,
}

impl ThreadSnapshot {
    /// Snapshot answering the request with `token`.
    pub fn correlated(token: RequestToken, messages: Vec<Message>) -> Self {
        Self { request_id: Some(token), messages }
    }

    /// Snapshot without correlation.
    pub fn bare(messages: Vec<Message>) -> Self {
        Self { request_id: None, messages }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ThreadSnapshotRepr {
    Correlated {
        #[serde(rename = "requestId")]
        request_id: RequestToken,
        messages: Vec<Message>,
    },
    Bare(Vec<Message>),
}

impl From<ThreadSnapshotRepr> for ThreadSnapshot {
    fn from(repr: ThreadSnapshotRepr) -> Self {
        match repr {
            ThreadSnapshotRepr::Correlated { request_id, messages } => {
                Self::correlated(request_id, messages)
            },
            ThreadSnapshotRepr::Bare(messages) => Self::bare(messages),
        }
    }
}

impl From<ThreadSnapshot> for ThreadSnapshotRepr {
    fn from(snapshot: ThreadSnapshot) -> Self {
        match snapshot.request_id {
            Some(request_id) => Self::Correlated { request_id, messages: snapshot.messages },
            None => Self::Bare(snapshot.messages),
        }
    }
}

/// Failure report for an outbound intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFailure {
    /// Intent that failed.
    pub intent: Intent,
    /// Token of the failed `getMessages`, when the intent was a thread
    /// request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestToken>,
    /// Human-readable reason.
    pub reason: String,
}

/// Outbound intent kinds, named by their wire event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// `addUser`
    #[serde(rename = "addUser")]
    AnnouncePresence,
    /// `getChatUsers`
    #[serde(rename = "getChatUsers")]
    RequestDirectory,
    /// `getMessages`
    #[serde(rename = "getMessages")]
    RequestThread,
    /// `sendMessage`
    #[serde(rename = "sendMessage")]
    SendMessage,
    /// `updateMessage`
    #[serde(rename = "updateMessage")]
    EditMessage,
    /// `deleteMessage`
    #[serde(rename = "deleteMessage")]
    DeleteMessage,
}

impl Intent {
    /// Wire event name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnnouncePresence => "addUser",
            Self::RequestDirectory => "getChatUsers",
            Self::RequestThread => "getMessages",
            Self::SendMessage => "sendMessage",
            Self::EditMessage => "updateMessage",
            Self::DeleteMessage => "deleteMessage",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AnnouncePresence => "announce presence",
            Self::RequestDirectory => "load conversations",
            Self::RequestThread => "load messages",
            Self::SendMessage => "send message",
            Self::EditMessage => "edit message",
            Self::DeleteMessage => "delete message",
        };
        f.write_str(label)
    }
}
