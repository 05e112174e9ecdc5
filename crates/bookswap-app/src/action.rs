//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use bookswap_proto::Outbound;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Connect to the relay.
    Connect {
        /// Relay WebSocket URL.
        relay_url: String,
    },

    /// Emit an event to the relay through the bridge.
    Emit(Outbound),
}
