//! Conversation view invariants.
//!
//! Each invariant is a property of one client's view that no sequence of relay
//! traffic or key presses may break: the thread shows only the selected pair,
//! ids are unique, the composer bound holds, and every cursor points at a real
//! row.
//!
//! The harness projects an [`App`](bookswap_app::App) into a
//! [`ClientSnapshot`] after every render and runs the registry over it. A
//! failing check names the invariant and the user whose view broke.
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.check_all(&SystemSnapshot::from_app(&app))?;
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    CursorsInBounds, EditTargetOwned, StagedImagesBounded, ThreadMatchesSelection,
    UniqueMessageIds,
};
pub use snapshot::{ClientSnapshot, MessageSnapshot, SystemSnapshot};

/// Outcome of one check on one client. The error is a description of the
/// broken state.
pub type InvariantResult = Result<(), String>;

/// A broken invariant, attributed to the client that broke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Local user of the offending view, or `<anonymous>` before identity.
    pub client: String,
    /// What was observed.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.invariant, self.client, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of a single client's conversation view.
pub trait Invariant: Send + Sync {
    /// Stable name used in violation reports.
    fn name(&self) -> &'static str;

    /// Check one client's view.
    fn check(&self, client: &ClientSnapshot) -> InvariantResult;
}

/// Ordered set of invariants applied to every client in a snapshot.
#[derive(Default)]
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every conversation invariant:
    /// [`ThreadMatchesSelection`], [`UniqueMessageIds`],
    /// [`StagedImagesBounded`], [`EditTargetOwned`] and [`CursorsInBounds`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ThreadMatchesSelection);
        registry.add(UniqueMessageIds);
        registry.add(StagedImagesBounded);
        registry.add(EditTargetOwned);
        registry.add(CursorsInBounds);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Run every invariant against one client.
    pub fn check_client(&self, client: &ClientSnapshot) -> Vec<Violation> {
        let label = client.self_id.as_ref().map_or("<anonymous>", |id| id.as_str());
        self.invariants
            .iter()
            .filter_map(|invariant| {
                invariant.check(client).err().map(|message| Violation {
                    invariant: invariant.name(),
                    client: label.to_string(),
                    message,
                })
            })
            .collect()
    }

    /// Run every invariant against every client.
    ///
    /// Returns all violations, grouped by client in snapshot order.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            state.clients.iter().flat_map(|client| self.check_client(client)).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Like [`InvariantRegistry::check_all`], but panics with every violation.
    #[allow(clippy::panic, reason = "Test assertion helper")]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let lines: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("invariants broken {context}:\n  {}", lines.join("\n  "));
        }
    }

    /// Names of the registered invariants, in check order.
    pub fn names(&self) -> Vec<&'static str> {
        self.invariants.iter().map(|invariant| invariant.name()).collect()
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use bookswap_client::ViewState;
    use bookswap_proto::{MessageId, UserId};

    use super::*;

    fn client(self_id: Option<&str>) -> ClientSnapshot {
        ClientSnapshot {
            self_id: self_id.map(|id| UserId::new(id).unwrap()),
            view_state: ViewState::NoSelection,
            selected: None,
            thread: vec![],
            staged_images: 0,
            editing: None,
            directory_rows: 0,
            directory_cursor: 0,
            highlighted: None,
            viewer: None,
        }
    }

    #[test]
    fn standard_registry_lists_every_check() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.names(),
            [
                "thread_matches_selection",
                "unique_message_ids",
                "staged_images_bounded",
                "edit_target_owned",
                "cursors_in_bounds",
            ]
        );
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&SystemSnapshot::empty()).is_ok());
    }

    #[test]
    fn violations_name_the_offending_client() {
        let healthy = client(Some("alice"));
        let mut broken = client(Some("bob"));
        broken.highlighted = Some(MessageId::new("m9").unwrap());

        let violations = InvariantRegistry::standard()
            .check_all(&SystemSnapshot::from_clients(vec![healthy, broken]))
            .unwrap_err();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].invariant, "cursors_in_bounds");
        assert_eq!(violations[0].client, "bob");
        assert_eq!(
            violations[0].to_string(),
            "cursors_in_bounds [bob]: highlighted m9 not in the thread"
        );
    }

    #[test]
    fn anonymous_client_is_labelled() {
        let mut anonymous = client(None);
        anonymous.staged_images = 9;
        let violations = InvariantRegistry::standard().check_client(&anonymous);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].client, "<anonymous>");
    }
}
