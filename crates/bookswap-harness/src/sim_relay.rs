//! In-memory relay model.
//!
//! `SimRelay` answers the client's socket contract the way the production
//! relay does, without a socket. Connections are plain ids with an outbox of
//! encoded event text; tests and the [`crate::SimDriver`] drain outboxes to
//! feed clients.
//!
//! Beyond the happy path it can hold thread replies and release them in
//! reverse order (to exercise stale-response handling), and fail the next
//! intent of a given kind.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bookswap_proto::{
    Counterpart, ImageRef, Inbound, Intent, Message, MessageId, Outbound, ProtocolError,
    RequestFailure, RequestToken, ThreadSnapshot, UserId,
};
use chrono::{DateTime, TimeDelta, Utc};

/// Identifies one simulated socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Connection {
    /// Identity announced with `addUser`.
    user: Option<UserId>,
    /// Encoded events waiting to be delivered.
    outbox: VecDeque<String>,
}

#[derive(Debug, Clone)]
struct Profile {
    full_name: String,
    email: String,
}

/// Thread reply withheld by [`SimRelay::hold_thread_replies`].
#[derive(Debug)]
struct HeldReply {
    connection: ConnectionId,
    event: Inbound,
}

/// In-memory relay.
#[derive(Debug)]
pub struct SimRelay {
    profiles: HashMap<UserId, Profile>,
    connections: BTreeMap<ConnectionId, Connection>,
    next_connection: u64,
    messages: Vec<Message>,
    next_message: u64,
    clock: DateTime<Utc>,
    hold_threads: bool,
    held: Vec<HeldReply>,
    failures: VecDeque<(Intent, String)>,
    received: Vec<(ConnectionId, Outbound)>,
}

impl Default for SimRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRelay {
    /// Create an empty relay. The clock starts at the Unix epoch and advances
    /// one second per accepted message.
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            connections: BTreeMap::new(),
            next_connection: 1,
            messages: Vec::new(),
            next_message: 1,
            clock: DateTime::<Utc>::default(),
            hold_threads: false,
            held: Vec::new(),
            failures: VecDeque::new(),
            received: Vec::new(),
        }
    }

    /// Register a user profile used for directory entries.
    pub fn register(&mut self, user_id: UserId, full_name: &str, email: &str) {
        self.profiles
            .insert(user_id, Profile { full_name: full_name.to_string(), email: email.to_string() });
    }

    /// Open a new connection.
    pub fn open(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(id, Connection::default());
        tracing::debug!(%id, "connection opened");
        id
    }

    /// Close a connection. Remaining clients get a fresh presence snapshot if
    /// the closed connection had announced itself.
    pub fn close(&mut self, connection: ConnectionId) {
        let Some(closed) = self.connections.remove(&connection) else { return };
        self.held.retain(|reply| reply.connection != connection);
        tracing::debug!(id = %connection, "connection closed");
        if closed.user.is_some() {
            self.broadcast_presence();
        }
    }

    /// Whether the connection is open.
    pub fn is_open(&self, connection: ConnectionId) -> bool {
        self.connections.contains_key(&connection)
    }

    /// Receive encoded event text from a connection.
    pub fn receive(&mut self, connection: ConnectionId, text: &str) -> Result<(), ProtocolError> {
        let event = Outbound::decode(text)?;
        self.handle(connection, event);
        Ok(())
    }

    /// Handle a decoded event from a connection.
    pub fn handle(&mut self, connection: ConnectionId, event: Outbound) {
        if !self.is_open(connection) {
            tracing::debug!(id = %connection, event = event.name(), "event on closed connection");
            return;
        }
        self.received.push((connection, event.clone()));

        if let Some(reason) = self.take_failure(event.intent()) {
            let request_id = match &event {
                Outbound::RequestThread { request_id, .. } => Some(*request_id),
                _ => None,
            };
            self.fail(connection, event.intent(), request_id, reason);
            return;
        }

        match event {
            Outbound::AnnouncePresence(user_id) => {
                if let Some(conn) = self.connections.get_mut(&connection) {
                    conn.user = Some(user_id);
                }
                self.broadcast_presence();
            },
            Outbound::RequestDirectory(user_id) => {
                let directory = self.directory(&user_id);
                self.push(connection, &Inbound::DirectorySnapshot(directory));
            },
            Outbound::RequestThread { self_id, counterpart_id, request_id } => {
                self.answer_thread(connection, &self_id, &counterpart_id, request_id);
            },
            Outbound::SendMessage { sender_id, receiver_id, text, images } => {
                self.accept_message(connection, sender_id, receiver_id, text, images);
            },
            Outbound::EditMessage { message_id, new_text, self_id, .. } => {
                self.edit_message(connection, &message_id, new_text, &self_id);
            },
            Outbound::DeleteMessage { message_id, self_id, .. } => {
                self.delete_message(connection, &message_id, &self_id);
            },
        }
    }

    /// Push an arbitrary event to a connection, bypassing the relay logic.
    pub fn inject(&mut self, connection: ConnectionId, event: &Inbound) {
        self.push(connection, event);
    }

    /// Pop the next encoded event waiting for a connection.
    pub fn pop_outbox(&mut self, connection: ConnectionId) -> Option<String> {
        self.connections.get_mut(&connection)?.outbox.pop_front()
    }

    /// Take every encoded event waiting for a connection.
    pub fn take_outbox(&mut self, connection: ConnectionId) -> Vec<String> {
        self.connections
            .get_mut(&connection)
            .map(|conn| conn.outbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Withhold thread replies until [`SimRelay::release_thread_replies`].
    pub fn hold_thread_replies(&mut self, hold: bool) {
        self.hold_threads = hold;
    }

    /// Deliver withheld thread replies, newest first.
    pub fn release_thread_replies(&mut self) -> usize {
        let held = std::mem::take(&mut self.held);
        let count = held.len();
        for reply in held.into_iter().rev() {
            self.push(reply.connection, &reply.event);
        }
        count
    }

    /// Fail the next event of the given intent with `reason`.
    pub fn fail_next(&mut self, intent: Intent, reason: &str) {
        self.failures.push_back((intent, reason.to_string()));
    }

    /// Every event received, in order.
    pub fn received(&self) -> &[(ConnectionId, Outbound)] {
        &self.received
    }

    /// Stored messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Users with at least one announced connection, sorted.
    pub fn online(&self) -> Vec<UserId> {
        let online: BTreeSet<_> =
            self.connections.values().filter_map(|conn| conn.user.clone()).collect();
        online.into_iter().collect()
    }

    fn is_online(&self, user: &UserId) -> bool {
        self.connections.values().any(|conn| conn.user.as_ref() == Some(user))
    }

    /// Directory of `user`: everyone they have exchanged messages with,
    /// most recent conversation first.
    fn directory(&self, user: &UserId) -> Vec<Counterpart> {
        let mut latest: Vec<(UserId, &Message)> = Vec::new();
        for message in self.messages.iter().rev().filter(|m| m.involves(user)) {
            let other = if &message.sender == user { &message.receiver } else { &message.sender };
            if !latest.iter().any(|(id, _)| id == other) {
                latest.push((other.clone(), message));
            }
        }

        latest
            .into_iter()
            .map(|(user_id, message)| {
                let (full_name, email) = self.profiles.get(&user_id).map_or_else(
                    || (user_id.to_string(), String::new()),
                    |profile| (profile.full_name.clone(), profile.email.clone()),
                );
                let online = self.is_online(&user_id);
                Counterpart {
                    last_message: message.text().unwrap_or_default().to_string(),
                    last_time: Some(message.created_at),
                    online,
                    ..Counterpart::new(user_id, full_name, email)
                }
            })
            .collect()
    }

    fn answer_thread(
        &mut self,
        connection: ConnectionId,
        self_id: &UserId,
        counterpart_id: &UserId,
        token: RequestToken,
    ) {
        let messages =
            self.messages.iter().filter(|m| m.is_between(self_id, counterpart_id)).cloned().collect();
        let event = Inbound::ThreadSnapshot(ThreadSnapshot::correlated(token, messages));

        if self.hold_threads {
            tracing::debug!(id = %connection, %token, "holding thread reply");
            self.held.push(HeldReply { connection, event });
        } else {
            self.push(connection, &event);
        }
    }

    fn accept_message(
        &mut self,
        connection: ConnectionId,
        sender: UserId,
        receiver: UserId,
        text: Option<String>,
        images: Vec<ImageRef>,
    ) {
        let Ok(id) = MessageId::new(format!("m{}", self.next_message)) else { return };
        self.clock += TimeDelta::seconds(1);
        let message = Message {
            id,
            sender,
            receiver,
            text,
            images,
            edited: false,
            edited_at: None,
            created_at: self.clock,
        };

        if let Err(e) = message.validate() {
            self.fail(connection, Intent::SendMessage, None, e.to_string());
            return;
        }

        self.next_message += 1;
        self.messages.push(message.clone());
        self.fan_out(&message.sender, &message.receiver, &Inbound::MessageReceived(message.clone()));
    }

    fn edit_message(
        &mut self,
        connection: ConnectionId,
        message_id: &MessageId,
        new_text: String,
        editor: &UserId,
    ) {
        let clock = self.clock;
        let Some(message) = self.owned_message(connection, Intent::EditMessage, message_id, editor)
        else {
            return;
        };

        message.text = Some(new_text);
        message.edited = true;
        message.edited_at = Some(clock);
        let updated = message.clone();
        self.fan_out(&updated.sender, &updated.receiver, &Inbound::MessageUpdated(updated.clone()));
    }

    fn delete_message(&mut self, connection: ConnectionId, message_id: &MessageId, editor: &UserId) {
        let Some(message) = self.owned_message(connection, Intent::DeleteMessage, message_id, editor)
        else {
            return;
        };

        let (sender, receiver) = (message.sender.clone(), message.receiver.clone());
        self.messages.retain(|m| &m.id != message_id);
        self.fan_out(&sender, &receiver, &Inbound::MessageDeleted { message_id: message_id.clone() });
    }

    /// Look up a message `editor` may change, failing the intent otherwise.
    fn owned_message(
        &mut self,
        connection: ConnectionId,
        intent: Intent,
        message_id: &MessageId,
        editor: &UserId,
    ) -> Option<&mut Message> {
        let Some(index) = self.messages.iter().position(|m| &m.id == message_id) else {
            self.fail(connection, intent, None, "message not found".to_string());
            return None;
        };
        if &self.messages[index].sender != editor {
            self.fail(connection, intent, None, "not your message".to_string());
            return None;
        }
        self.messages.get_mut(index)
    }

    fn take_failure(&mut self, intent: Intent) -> Option<String> {
        let index = self.failures.iter().position(|(kind, _)| *kind == intent)?;
        self.failures.remove(index).map(|(_, reason)| reason)
    }

    fn fail(
        &mut self,
        connection: ConnectionId,
        intent: Intent,
        request_id: Option<RequestToken>,
        reason: String,
    ) {
        tracing::debug!(id = %connection, %intent, %reason, "request failed");
        self.push(connection, &Inbound::RequestFailed(RequestFailure { intent, request_id, reason }));
    }

    fn broadcast_presence(&mut self) {
        let event = Inbound::PresenceSnapshot(self.online());
        let ids: Vec<_> = self.connections.keys().copied().collect();
        for id in ids {
            self.push(id, &event);
        }
    }

    /// Deliver to every connection of either participant.
    fn fan_out(&mut self, a: &UserId, b: &UserId, event: &Inbound) {
        let ids: Vec<_> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.user.as_ref().is_some_and(|u| u == a || u == b))
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.push(id, event);
        }
    }

    fn push(&mut self, connection: ConnectionId, event: &Inbound) {
        let Some(conn) = self.connections.get_mut(&connection) else { return };
        match event.encode() {
            Ok(text) => conn.outbox.push_back(text),
            Err(e) => tracing::warn!("failed to encode {}: {e}", event.name()),
        }
    }
}

/// Thread-safe handle to a [`SimRelay`] shared by several drivers.
pub type SharedSimRelay = Arc<Mutex<SimRelay>>;

/// Create a shared relay.
pub fn create_shared_relay() -> SharedSimRelay {
    Arc::new(Mutex::new(SimRelay::new()))
}

/// Lock a shared value, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
