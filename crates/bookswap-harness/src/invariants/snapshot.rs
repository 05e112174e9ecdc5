//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use bookswap_app::App;
use bookswap_client::{Coordinator, ViewState};
use bookswap_proto::{MessageId, UserId};
use serde::Serialize;

/// Snapshot of the entire system state.
///
/// Contains observable state from one or more clients for invariant checking.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients }
    }

    /// Snapshot of a single App.
    pub fn from_app(app: &App) -> Self {
        Self::single(ClientSnapshot::from_app(app))
    }
}

/// One message as seen in a thread: id and participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSnapshot {
    /// Message id.
    pub id: MessageId,
    /// Author.
    pub sender: UserId,
    /// Recipient.
    pub receiver: UserId,
    /// Text, if any.
    pub text: Option<String>,
    /// Edited flag.
    pub edited: bool,
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSnapshot {
    /// Local user. `None` before identification.
    pub self_id: Option<UserId>,
    /// Selection phase.
    #[serde(serialize_with = "view_state_name")]
    pub view_state: ViewState,
    /// Selected counterpart.
    pub selected: Option<UserId>,
    /// Displayed thread, in order. Empty unless the thread is ready.
    pub thread: Vec<MessageSnapshot>,
    /// Number of staged images.
    pub staged_images: usize,
    /// Message being edited.
    pub editing: Option<MessageId>,
    /// Rows in the filtered directory.
    pub directory_rows: usize,
    /// Highlighted directory row.
    pub directory_cursor: usize,
    /// Highlighted message.
    pub highlighted: Option<MessageId>,
    /// Open viewer as (message, index, image count).
    pub viewer: Option<(MessageId, usize, usize)>,
}

impl ClientSnapshot {
    /// Snapshot of a bare coordinator (no UI state).
    pub fn from_coordinator(coordinator: &Coordinator) -> Self {
        let thread = coordinator
            .thread()
            .map(|thread| {
                thread
                    .messages()
                    .iter()
                    .map(|m| MessageSnapshot {
                        id: m.id.clone(),
                        sender: m.sender.clone(),
                        receiver: m.receiver.clone(),
                        text: m.text.clone(),
                        edited: m.edited,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            self_id: coordinator.self_id().cloned(),
            view_state: coordinator.view_state(),
            selected: coordinator.selected().map(|c| c.user_id.clone()),
            thread,
            staged_images: coordinator.composer().staged().len(),
            editing: coordinator.composer().edit().map(|edit| edit.message_id.clone()),
            directory_rows: coordinator.directory().len(),
            directory_cursor: 0,
            highlighted: None,
            viewer: None,
        }
    }

    /// Snapshot of an App, including UI state.
    pub fn from_app(app: &App) -> Self {
        Self {
            directory_rows: app.filtered_directory().len(),
            directory_cursor: app.directory_cursor(),
            highlighted: app.highlighted_message().map(|m| m.id.clone()),
            viewer: app
                .viewer()
                .map(|viewer| (viewer.message_id().clone(), viewer.index(), viewer.len())),
            ..Self::from_coordinator(app.conversation())
        }
    }
}

fn view_state_name<S: serde::Serializer>(state: &ViewState, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(match state {
        ViewState::NoSelection => "no-selection",
        ViewState::LoadingThread => "loading-thread",
        ViewState::ThreadReady => "thread-ready",
        ViewState::ThreadFailed => "thread-failed",
    })
}
