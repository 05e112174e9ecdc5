//! Draft text, staged images and edit mode.

use bookswap_proto::{ImageRef, MessageId};

/// Most images a single message may carry.
pub const MAX_STAGED_IMAGES: usize = 5;

/// Message being prepared for the selected counterpart.
///
/// Editing an existing message is a separate mode: while an edit is open,
/// [`Composer::active_text_mut`] points at the edit text and the draft is left
/// untouched until the edit is saved or cancelled.
///
/// # Invariants
///
/// - At most [`MAX_STAGED_IMAGES`] images are staged.
/// - Staged images are distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    text: String,
    images: Vec<ImageRef>,
    edit: Option<EditDraft>,
}

/// A draft ready to send. Text is trimmed and `None` when blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Message text.
    pub text: Option<String>,
    /// Attached images, in staging order.
    pub images: Vec<ImageRef>,
}

/// Replacement text for one of the user's messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    /// Message being edited.
    pub message_id: MessageId,
    /// Replacement text.
    pub text: String,
}

impl Composer {
    /// Draft text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the draft text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Text the input line is bound to: the edit text while editing,
    /// otherwise the draft text.
    pub fn active_text(&self) -> &str {
        match &self.edit {
            Some(edit) => &edit.text,
            None => &self.text,
        }
    }

    /// Mutable access to [`Composer::active_text`].
    pub fn active_text_mut(&mut self) -> &mut String {
        match &mut self.edit {
            Some(edit) => &mut edit.text,
            None => &mut self.text,
        }
    }

    /// Stage images in order. Images beyond [`MAX_STAGED_IMAGES`] are
    /// dropped. Returns the number staged.
    pub fn stage(&mut self, images: impl IntoIterator<Item = ImageRef>) -> usize {
        let before = self.images.len();
        let room = MAX_STAGED_IMAGES.saturating_sub(before);
        self.images.extend(images.into_iter().take(room));
        self.images.len() - before
    }

    /// Remove the staged image at `index`.
    pub fn unstage(&mut self, index: usize) -> Option<ImageRef> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    /// Staged images, in staging order.
    pub fn staged(&self) -> &[ImageRef] {
        &self.images
    }

    /// Draft has non-blank text or at least one image.
    pub fn is_sendable(&self) -> bool {
        !self.text.trim().is_empty() || !self.images.is_empty()
    }

    /// Take the draft for sending, clearing text and images. `None` when
    /// there is nothing to send, in which case nothing is cleared.
    pub fn take_draft(&mut self) -> Option<Draft> {
        if !self.is_sendable() {
            return None;
        }
        let text = std::mem::take(&mut self.text);
        let text = text.trim();
        Some(Draft {
            text: (!text.is_empty()).then(|| text.to_string()),
            images: std::mem::take(&mut self.images),
        })
    }

    /// Enter edit mode for `message_id`, prefilled with its current text.
    /// Replaces any edit already open.
    pub fn begin_edit(&mut self, message_id: MessageId, text: impl Into<String>) {
        self.edit = Some(EditDraft { message_id, text: text.into() });
    }

    /// Open edit, if any.
    pub fn edit(&self) -> Option<&EditDraft> {
        self.edit.as_ref()
    }

    /// Edit mode is open.
    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    /// Edit mode is open for `message_id`.
    pub fn is_editing_message(&self, message_id: &MessageId) -> bool {
        self.edit.as_ref().is_some_and(|edit| &edit.message_id == message_id)
    }

    /// Close the edit if its text is non-blank, returning it trimmed. A blank
    /// edit stays open and `None` is returned.
    pub fn take_edit(&mut self) -> Option<EditDraft> {
        if self.edit.as_ref().is_none_or(|edit| edit.text.trim().is_empty()) {
            return None;
        }
        self.edit.take().map(|edit| EditDraft {
            text: edit.text.trim().to_string(),
            message_id: edit.message_id,
        })
    }

    /// Leave edit mode. Returns `false` if no edit was open.
    pub fn cancel_edit(&mut self) -> bool {
        self.edit.take().is_some()
    }
}
