//! Observable application state types.
//!
//! This module defines the UI-side view model that sits next to the
//! conversation [`Coordinator`](bookswap_client::Coordinator): connection
//! phase, keyboard focus and the image viewer.

use bookswap_proto::{ImageRef, Message, MessageId};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the relay.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Socket open.
    Connected,
}

/// Pane receiving keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Conversation list and search.
    Directory,
    /// Message history of the selected conversation.
    Thread,
    /// Input line.
    Composer,
}

impl Focus {
    /// Next pane in `Tab` order.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Directory => Self::Thread,
            Self::Thread => Self::Composer,
            Self::Composer => Self::Directory,
        }
    }
}

/// Full-size view of one message's images.
///
/// Navigation stops at either end; it does not wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageViewer {
    message_id: MessageId,
    images: Vec<ImageRef>,
    index: usize,
}

impl ImageViewer {
    /// Viewer positioned on the first image of `message`. `None` for
    /// text-only messages.
    pub fn open(message: &Message) -> Option<Self> {
        message.has_images().then(|| Self {
            message_id: message.id.clone(),
            images: message.images.clone(),
            index: 0,
        })
    }

    /// Message whose images are shown.
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Image currently shown.
    pub fn current(&self) -> &ImageRef {
        &self.images[self.index]
    }

    /// Zero-based position of the current image.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of images in the viewer.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Viewer has no images. Never true for a viewer built with
    /// [`ImageViewer::open`].
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Advance to the next image. Returns `false` at the last image.
    pub fn next(&mut self) -> bool {
        if self.index + 1 >= self.images.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Step back to the previous image. Returns `false` at the first image.
    pub fn previous(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use bookswap_proto::UserId;
    use chrono::DateTime;

    use super::*;

    fn message(images: usize) -> Message {
        Message {
            id: MessageId::new("m1").unwrap(),
            sender: UserId::new("a").unwrap(),
            receiver: UserId::new("b").unwrap(),
            text: Some("cover photos".into()),
            images: (0..images).map(|i| ImageRef::new(format!("{i}.jpg"))).collect(),
            edited: false,
            edited_at: None,
            created_at: DateTime::from_timestamp(0, 0).unwrap(),
        }
    }

    #[test]
    fn text_only_message_has_no_viewer() {
        assert!(ImageViewer::open(&message(0)).is_none());
    }

    #[test]
    fn navigation_stops_at_both_ends() {
        let mut viewer = ImageViewer::open(&message(3)).unwrap();
        assert!(!viewer.previous());
        assert!(viewer.next());
        assert!(viewer.next());
        assert!(!viewer.next());
        assert_eq!(viewer.current(), &ImageRef::new("2.jpg"));
        assert_eq!(viewer.index(), 2);
    }

    #[test]
    fn focus_cycles_through_all_panes() {
        let start = Focus::Directory;
        assert_eq!(start.next().next().next(), start);
    }
}
