//! Standard conversation invariants.

use std::collections::HashSet;

use bookswap_client::{MAX_STAGED_IMAGES, MessageId, UserId, ViewState};

use super::{ClientSnapshot, Invariant, InvariantResult};

/// A thread is displayed only when ready, and only holds the selected pair.
///
/// Every displayed message must be between the local user and the selected
/// counterpart. A message from another conversation leaking into the view is
/// the failure this guards against.
pub struct ThreadMatchesSelection;

impl Invariant for ThreadMatchesSelection {
    fn name(&self) -> &'static str {
        "thread_matches_selection"
    }

    fn check(&self, client: &ClientSnapshot) -> InvariantResult {
        if client.view_state != ViewState::ThreadReady {
            if !client.thread.is_empty() {
                return Err(format!(
                    "{} messages shown while {:?}",
                    client.thread.len(),
                    client.view_state
                ));
            }
            return Ok(());
        }

        let (Some(me), Some(other)) = (&client.self_id, &client.selected) else {
            return Err("thread ready without a pair".into());
        };

        let pair = |a: &UserId, b: &UserId| (a == me && b == other) || (a == other && b == me);
        match client.thread.iter().find(|m| !pair(&m.sender, &m.receiver)) {
            Some(stray) => Err(format!(
                "message {} ({} -> {}) shown in thread with {other}",
                stray.id, stray.sender, stray.receiver
            )),
            None => Ok(()),
        }
    }
}

/// No message id appears twice in a displayed thread.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "unique_message_ids"
    }

    fn check(&self, client: &ClientSnapshot) -> InvariantResult {
        let mut seen = HashSet::new();
        match client.thread.iter().find(|message| !seen.insert(&message.id)) {
            Some(duplicate) => Err(format!("message {} shown twice", duplicate.id)),
            None => Ok(()),
        }
    }
}

/// At most [`MAX_STAGED_IMAGES`] images are staged for one message.
pub struct StagedImagesBounded;

impl Invariant for StagedImagesBounded {
    fn name(&self) -> &'static str {
        "staged_images_bounded"
    }

    fn check(&self, client: &ClientSnapshot) -> InvariantResult {
        if client.staged_images > MAX_STAGED_IMAGES {
            return Err(format!(
                "{} images staged (max {MAX_STAGED_IMAGES})",
                client.staged_images
            ));
        }
        Ok(())
    }
}

/// An open edit targets a message in the thread sent by the local user.
pub struct EditTargetOwned;

impl Invariant for EditTargetOwned {
    fn name(&self) -> &'static str {
        "edit_target_owned"
    }

    fn check(&self, client: &ClientSnapshot) -> InvariantResult {
        let Some(editing) = &client.editing else { return Ok(()) };

        match client.thread.iter().find(|m| &m.id == editing) {
            None => Err(format!("editing {editing}, which is not in the thread")),
            Some(target) if Some(&target.sender) != client.self_id.as_ref() => {
                Err(format!("editing {editing}, which is not an own message"))
            },
            Some(_) => Ok(()),
        }
    }
}

/// Directory cursor, message highlight and image viewer point at real rows.
pub struct CursorsInBounds;

impl Invariant for CursorsInBounds {
    fn name(&self) -> &'static str {
        "cursors_in_bounds"
    }

    fn check(&self, client: &ClientSnapshot) -> InvariantResult {
        let in_thread = |id: &MessageId| client.thread.iter().any(|m| &m.id == id);

        if client.directory_rows > 0 && client.directory_cursor >= client.directory_rows {
            return Err(format!(
                "directory cursor {} past {} rows",
                client.directory_cursor, client.directory_rows
            ));
        }

        if let Some(highlighted) = &client.highlighted {
            if !in_thread(highlighted) {
                return Err(format!("highlighted {highlighted} not in the thread"));
            }
        }

        if let Some((message_id, index, len)) = &client.viewer {
            if index >= len {
                return Err(format!("viewer at image {index} of {len}"));
            }
            if !in_thread(message_id) {
                return Err(format!("viewer open on {message_id}, not in the thread"));
            }
        }
        Ok(())
    }
}
