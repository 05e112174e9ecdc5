//! Bookswap relay protocol
//!
//! Typed events exchanged with the conversation relay, the JSON envelope that
//! carries them, and the validation applied at the transport boundary.
//!
//! Every WebSocket text frame holds exactly one envelope:
//!
//! ```json
//! {"event": "receiveMessage", "data": { ... }}
//! ```
//!
//! # Components
//!
//! - [`Outbound`]: intents the client sends to the relay
//! - [`Inbound`]: snapshots and notifications the relay pushes to the client
//! - [`Message`], [`Counterpart`]: conversation data carried by the events
//! - [`UserId`], [`MessageId`], [`RequestToken`]: identifiers
//!
//! # Invariants
//!
//! A decoded [`Inbound`] has passed [`Inbound::validate`]: every message in it
//! carries text or at least one image, and no identifier is empty.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
mod event;
mod ids;
mod model;

pub use errors::{ProtocolError, Result};
pub use event::{Inbound, Intent, Outbound, RequestFailure, ThreadSnapshot};
pub use ids::{MessageId, RequestToken, UserId};
pub use model::{Counterpart, ImageRef, MediaBase, Message};
