//! Application input events.
//!
//! This module defines [`AppEvent`], the comprehensive set of inputs that drive
//! the [`crate::App`] state machine.
//!
//! Events originate from two distinct sources:
//! - User interactions (Keyboard, Resize) and system ticks.
//! - Relay notifications decoded by the [`crate::Bridge`].

use bookswap_client::NavigationContext;
use bookswap_proto::{Inbound, UserId};

use crate::KeyInput;

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Connection in progress.
    Connecting,

    /// Socket to the relay is open.
    Connected,

    /// Socket to the relay closed.
    Disconnected,

    /// Local user's identity is known.
    Identified {
        /// Local user.
        user_id: UserId,
    },

    /// Chat opened from a book listing.
    Navigated(NavigationContext),

    /// Event decoded from the relay.
    Relay(Inbound),

    /// Error occurred.
    Error {
        /// Error description.
        message: String,
    },
}
