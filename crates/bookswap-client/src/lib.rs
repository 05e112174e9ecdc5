//! Client
//!
//! Action-based conversation state machine for the Bookswap relay. Tracks the
//! conversation directory, the selected thread, and the composer, and decides
//! which relay requests to issue.
//!
//! # Architecture
//!
//! The client is Sans-IO. It receives events ([`ConversationEvent`]),
//! processes them through pure state machine logic, and returns actions
//! ([`ConversationAction`]) for the caller to execute. Nothing here touches a
//! socket or a clock.
//!
//! # Components
//!
//! - [`Coordinator`]: Top-level state machine owning the selection lifecycle
//! - [`Directory`]: Conversation list, presence set and name filter
//! - [`Thread`]: Messages exchanged with the selected counterpart
//! - [`Composer`]: Draft text, staged images and edit mode
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::RelayConnection`]: Channel pair bound to a relay socket
//! - [`transport::connect`]: Connect to a relay

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod composer;
mod coordinator;
mod directory;
mod error;
mod event;
mod thread;

#[cfg(feature = "transport")]
pub mod transport;

pub use bookswap_proto::{
    Counterpart, ImageRef, Inbound, Intent, Message, MessageId, Outbound, RequestToken, UserId,
};
pub use composer::{Composer, Draft, EditDraft, MAX_STAGED_IMAGES};
pub use coordinator::{Coordinator, ViewState};
pub use directory::Directory;
pub use error::ClientError;
pub use event::{ConversationAction, ConversationEvent, NavigationContext};
pub use thread::Thread;
