//! Relay-to-Application translation layer.
//!
//! The [`Bridge`] is the transport binding: it turns [`crate::AppAction::Emit`]
//! into wire text and wire text back into [`crate::AppEvent`]s.
//!
//! # Responsibilities
//!
//! - Encodes outbound events and accumulates them to be sent by the driver in
//!   the next I/O cycle.
//! - Decodes and validates inbound text; failures are logged and surfaced as
//!   [`crate::AppEvent::Error`].
//! - Gates traffic on mount state. The binding is mounted once the local
//!   identity is known; while unmounted, outbound events are dropped and
//!   inbound events are ignored, so re-mounting never double-handles events.

use bookswap_proto::{Inbound, UserId};

use crate::{AppAction, AppEvent};

/// Bridge between App actions and relay wire text.
#[derive(Debug, Default)]
pub struct Bridge {
    mounted_as: Option<UserId>,
    outgoing: Vec<String>,
}

impl Bridge {
    /// Create an unmounted bridge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start forwarding traffic for `user_id`. Mounting again as the same
    /// user is a no-op.
    pub fn mount(&mut self, user_id: UserId) {
        if self.mounted_as.as_ref() == Some(&user_id) {
            return;
        }
        tracing::info!(%user_id, "relay binding mounted");
        self.mounted_as = Some(user_id);
    }

    /// Stop forwarding traffic and drop anything not yet sent.
    pub fn unmount(&mut self) {
        if self.mounted_as.take().is_some() {
            tracing::info!("relay binding unmounted");
        }
        self.outgoing.clear();
    }

    /// User the binding is mounted for. `None` while unmounted.
    pub fn mounted_as(&self) -> Option<&UserId> {
        self.mounted_as.as_ref()
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::Emit(outbound) => {
                if self.mounted_as.is_none() {
                    tracing::debug!(event = outbound.name(), "dropping outbound event while unmounted");
                    return vec![];
                }
                match outbound.encode() {
                    Ok(text) => {
                        self.outgoing.push(text);
                        vec![]
                    },
                    Err(e) => {
                        tracing::warn!("failed to encode {}: {e}", outbound.name());
                        vec![AppEvent::Error { message: e.to_string() }]
                    },
                }
            },
            AppAction::Render | AppAction::Quit | AppAction::Connect { .. } => vec![],
        }
    }

    /// Handle text received from the relay.
    pub fn handle_text(&mut self, text: &str) -> Vec<AppEvent> {
        if self.mounted_as.is_none() {
            tracing::debug!("ignoring relay event while unmounted");
            return vec![];
        }
        match Inbound::decode(text) {
            Ok(inbound) => {
                tracing::debug!(event = inbound.name(), "relay event");
                vec![AppEvent::Relay(inbound)]
            },
            Err(e) => {
                tracing::warn!("dropping relay event: {e}");
                vec![AppEvent::Error { message: e.to_string() }]
            },
        }
    }

    /// Take pending outgoing text.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }
}
