//! Messages of the selected conversation.

use bookswap_proto::{Message, MessageId};

/// Ordered messages exchanged with one counterpart.
///
/// # Invariants
///
/// - Message ids are unique. Appending an id already present is a no-op.
/// - Order is relay order: snapshot order first, then arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thread {
    messages: Vec<Message>,
}

impl Thread {
    /// Thread from a relay snapshot. Later duplicates of an id are dropped.
    pub fn from_snapshot(messages: Vec<Message>) -> Self {
        let mut thread = Self::default();
        for message in messages {
            thread.append(message);
        }
        thread
    }

    /// Append a live message. Returns `false` if the id was already present.
    pub fn append(&mut self, message: Message) -> bool {
        if self.get(&message.id).is_some() {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Replace a message in place, marking it edited. Returns `false` if the
    /// id is not in the thread.
    pub fn update(&mut self, mut message: Message) -> bool {
        let Some(slot) = self.messages.iter_mut().find(|m| m.id == message.id) else {
            return false;
        };
        message.edited = true;
        *slot = message;
        true
    }

    /// Remove a message. Returns `false` if the id is not in the thread.
    pub fn remove(&mut self, id: &MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| &m.id != id);
        self.messages.len() != before
    }

    /// Look up a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Thread has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
