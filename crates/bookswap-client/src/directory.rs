//! Conversation directory and presence.

use std::collections::HashSet;

use bookswap_proto::{Counterpart, UserId};

/// The user's conversations plus the relay's set of online users.
///
/// Presence is tracked separately from the directory and the two may arrive
/// in either order. Until the first presence snapshot, the `online` flag
/// reported with each directory entry is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<Counterpart>,
    presence: Option<HashSet<UserId>>,
}

impl Directory {
    /// Replace the entries with a fresh snapshot, in relay order.
    pub fn replace(&mut self, entries: Vec<Counterpart>) {
        self.entries = entries;
    }

    /// Replace the presence set with a fresh snapshot.
    pub fn set_presence(&mut self, online: impl IntoIterator<Item = UserId>) {
        self.presence = Some(online.into_iter().collect());
    }

    /// Whether `user` is currently online.
    pub fn is_online(&self, user: &UserId) -> bool {
        match &self.presence {
            Some(online) => online.contains(user),
            None => self.find(user).is_some_and(|entry| entry.online),
        }
    }

    /// Number of users in the last presence snapshot.
    pub fn online_count(&self) -> usize {
        self.presence.as_ref().map_or(0, HashSet::len)
    }

    /// Entries in relay order.
    pub fn entries(&self) -> &[Counterpart] {
        &self.entries
    }

    /// Entry for `user`, if the user is in the directory.
    pub fn find(&self, user: &UserId) -> Option<&Counterpart> {
        self.entries.iter().find(|entry| &entry.user_id == user)
    }

    /// Entries whose name contains `query`, ignoring case. An empty query
    /// matches everything.
    pub fn filter<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Counterpart> + use<'a> {
        let needle = query.to_lowercase();
        self.entries.iter().filter(move |entry| entry.full_name.to_lowercase().contains(&needle))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
