//! Conversation data carried by relay events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    ids::{MessageId, UserId},
};

/// Conversation-directory entry: the other participant of a one-to-one
/// conversation, with preview metadata for the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterpart {
    /// Counterpart's user id.
    pub user_id: UserId,
    /// Display name. Directory filtering matches against this only.
    pub full_name: String,
    /// Contact email.
    #[serde(default, deserialize_with = "nullable_string")]
    pub email: String,
    /// Text of the most recent message in the conversation.
    #[serde(default, deserialize_with = "nullable_string")]
    pub last_message: String,
    /// Timestamp of the most recent message.
    #[serde(default, with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub last_time: Option<DateTime<Utc>>,
    /// When the counterpart was last connected.
    #[serde(default, with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Online flag as reported with the directory. Presence snapshots take
    /// precedence once one has been received.
    #[serde(default)]
    pub online: bool,
}

impl Counterpart {
    /// Counterpart with no preview metadata, e.g. a book uploader the user
    /// has never talked to.
    pub fn new(user_id: UserId, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id,
            full_name: full_name.into(),
            email: email.into(),
            last_message: String::new(),
            last_time: None,
            last_seen: None,
            online: false,
        }
    }

    /// Avatar glyph: first character of the name, upper-cased. `?` when the
    /// name is empty.
    pub fn initial(&self) -> char {
        self.full_name.chars().next().and_then(|c| c.to_uppercase().next()).unwrap_or('?')
    }
}

/// Relative path of an uploaded image, resolved against a [`MediaBase`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    /// Create an image reference.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Base location image references are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBase(String);

impl MediaBase {
    /// Create a media base from a URL or path prefix.
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    /// Absolute location of an image. Exactly one `/` separates the base
    /// from the reference.
    pub fn resolve(&self, image: &ImageRef) -> String {
        let base = self.0.trim_end_matches('/');
        let path = image.0.trim_start_matches('/');
        if base.is_empty() {
            return path.to_string();
        }
        format!("{base}/{path}")
    }
}

/// A message in a one-to-one conversation.
///
/// # Invariants
///
/// - At least one of non-blank `text` or non-empty `images` is present.
///   Checked by [`Message::validate`], which the decoder runs on every inbound
///   message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Relay-assigned id.
    #[serde(rename = "_id")]
    pub id: MessageId,
    /// Author.
    #[serde(deserialize_with = "user_ref")]
    pub sender: UserId,
    /// Recipient.
    #[serde(deserialize_with = "user_ref")]
    pub receiver: UserId,
    /// Text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Attached images, in display order.
    #[serde(
        rename = "image",
        default,
        deserialize_with = "nullable_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub images: Vec<ImageRef>,
    /// Text was changed after sending.
    #[serde(default)]
    pub edited: bool,
    /// When the text was last changed.
    #[serde(default, with = "lenient_time", skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    /// When the relay accepted the message.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Non-blank text body. `None` for image-only messages.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Message carries at least one image.
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Message was written by `user`.
    pub fn is_from(&self, user: &UserId) -> bool {
        &self.sender == user
    }

    /// Message was exchanged between `a` and `b`, in either direction.
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        (&self.sender == a && &self.receiver == b) || (&self.sender == b && &self.receiver == a)
    }

    /// Message involves `user` as sender or receiver.
    pub fn involves(&self, user: &UserId) -> bool {
        &self.sender == user || &self.receiver == user
    }

    /// Check the content invariant.
    pub fn validate(&self) -> Result<()> {
        if self.text().is_none() && !self.has_images() {
            return Err(ProtocolError::EmptyMessage { id: self.id.to_string() });
        }
        Ok(())
    }
}

/// Sender and receiver arrive either as a bare id or as a populated user
/// document.
fn user_ref<'de, D>(deserializer: D) -> std::result::Result<UserId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UserRef {
        Id(UserId),
        Populated {
            #[serde(rename = "_id")]
            id: UserId,
        },
    }

    Ok(match UserRef::deserialize(deserializer)? {
        UserRef::Id(id) | UserRef::Populated { id } => id,
    })
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Optional RFC 3339 timestamps where the relay uses `""` or `null` for
/// "never".
mod lenient_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[allow(clippy::ref_option, reason = "signature required by serde(with)")]
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|time| Some(time.with_timezone(&Utc)))
                .map_err(D::Error::custom),
        }
    }
}
