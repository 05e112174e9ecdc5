//! Conversation coordinator.
//!
//! Owns the selection lifecycle and reconciles relay events with the local
//! view. Every thread request carries a fresh [`RequestToken`]; a snapshot is
//! only applied while the request it answers is still the one in flight, so a
//! slow answer for a previously selected counterpart can never overwrite the
//! current thread.

use bookswap_proto::{
    Counterpart, Inbound, Intent, Message, MessageId, Outbound, RequestFailure, RequestToken,
    ThreadSnapshot, UserId,
};

use crate::{
    composer::Composer,
    directory::Directory,
    error::ClientError,
    event::{ConversationAction, ConversationEvent, NavigationContext},
    thread::Thread,
};

/// Observable phase of the selected conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// No counterpart selected.
    NoSelection,
    /// Thread requested, snapshot not yet applied.
    LoadingThread,
    /// Thread displayed and receiving live updates.
    ThreadReady,
    /// The relay refused the thread request. Retry is available.
    ThreadFailed,
}

#[derive(Debug, Clone)]
enum Selection {
    None,
    Loading { counterpart: Counterpart, token: RequestToken },
    Ready { counterpart: Counterpart, thread: Thread },
    Failed { counterpart: Counterpart, token: RequestToken, reason: String },
}

impl Selection {
    fn counterpart(&self) -> Option<&Counterpart> {
        match self {
            Self::None => None,
            Self::Loading { counterpart, .. }
            | Self::Ready { counterpart, .. }
            | Self::Failed { counterpart, .. } => Some(counterpart),
        }
    }
}

/// Conversation state machine.
///
/// Feed it [`ConversationEvent`]s and execute the returned
/// [`ConversationAction`]s. Relay events never fail; user commands return a
/// [`ClientError`] when refused and leave state unchanged.
#[derive(Debug, Clone)]
pub struct Coordinator {
    self_id: Option<UserId>,
    directory: Directory,
    composer: Composer,
    selection: Selection,
    last_token: RequestToken,
    pending_preselect: Option<NavigationContext>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// Coordinator with no identity and no selection.
    pub fn new() -> Self {
        Self {
            self_id: None,
            directory: Directory::default(),
            composer: Composer::default(),
            selection: Selection::None,
            last_token: RequestToken(0),
            pending_preselect: None,
        }
    }

    /// Process an event.
    pub fn handle(
        &mut self,
        event: ConversationEvent,
    ) -> Result<Vec<ConversationAction>, ClientError> {
        match event {
            ConversationEvent::Identified { user_id } => Ok(self.handle_identified(user_id)),
            ConversationEvent::Relay(inbound) => Ok(self.handle_relay(inbound)),
            ConversationEvent::Select(counterpart) => self.handle_select(counterpart),
            ConversationEvent::Preselect(context) => Ok(self.handle_preselect(context)),
            ConversationEvent::Retry => self.handle_retry(),
            ConversationEvent::Send => self.handle_send(),
            ConversationEvent::BeginEdit { message_id } => self.handle_begin_edit(&message_id),
            ConversationEvent::SaveEdit => self.handle_save_edit(),
            ConversationEvent::CancelEdit => {
                if self.composer.cancel_edit() {
                    Ok(Vec::new())
                } else {
                    Err(ClientError::NotEditing)
                }
            },
            ConversationEvent::Delete { message_id } => self.handle_delete(&message_id),
        }
    }

    /// Local user, once identified.
    pub fn self_id(&self) -> Option<&UserId> {
        self.self_id.as_ref()
    }

    /// Current phase.
    pub fn view_state(&self) -> ViewState {
        match self.selection {
            Selection::None => ViewState::NoSelection,
            Selection::Loading { .. } => ViewState::LoadingThread,
            Selection::Ready { .. } => ViewState::ThreadReady,
            Selection::Failed { .. } => ViewState::ThreadFailed,
        }
    }

    /// Selected counterpart, in any phase but [`ViewState::NoSelection`].
    pub fn selected(&self) -> Option<&Counterpart> {
        self.selection.counterpart()
    }

    /// Displayed thread. Only present in [`ViewState::ThreadReady`].
    pub fn thread(&self) -> Option<&Thread> {
        match &self.selection {
            Selection::Ready { thread, .. } => Some(thread),
            _ => None,
        }
    }

    /// Token of the thread request in flight.
    pub fn pending_token(&self) -> Option<RequestToken> {
        match &self.selection {
            Selection::Loading { token, .. } => Some(*token),
            _ => None,
        }
    }

    /// Reason the last thread load failed, in [`ViewState::ThreadFailed`].
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.selection {
            Selection::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Conversation directory.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Composer.
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Mutable composer, for text input and image staging.
    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// Whether `counterpart` is online.
    pub fn is_online(&self, counterpart: &UserId) -> bool {
        self.directory.is_online(counterpart)
    }

    /// Whether the local user may edit `message`: own message with text.
    pub fn is_editable(&self, message: &Message) -> bool {
        self.is_own(message) && message.text().is_some()
    }

    /// Whether the local user may delete `message`.
    pub fn is_own(&self, message: &Message) -> bool {
        self.self_id.as_ref().is_some_and(|me| message.is_from(me))
    }

    fn handle_identified(&mut self, user_id: UserId) -> Vec<ConversationAction> {
        if self.self_id.as_ref().is_some_and(|me| me != &user_id) {
            tracing::info!(%user_id, "identity changed, resetting conversations");
            let pending = self.pending_preselect.take();
            *self = Self { pending_preselect: pending, last_token: self.last_token, ..Self::new() };
        }

        let mut actions = vec![
            ConversationAction::Emit(Outbound::AnnouncePresence(user_id.clone())),
            ConversationAction::Emit(Outbound::RequestDirectory(user_id.clone())),
        ];
        self.self_id = Some(user_id.clone());

        if let Some(context) = self.pending_preselect.take() {
            actions.extend(self.handle_preselect(context));
        } else if let Some(counterpart) = self.selected().cloned() {
            // Tokens do not survive a new connection.
            tracing::debug!(counterpart = %counterpart.user_id, "reloading selected thread");
            actions.push(self.request_thread(&user_id, counterpart));
        }
        actions
    }

    fn handle_preselect(&mut self, context: NavigationContext) -> Vec<ConversationAction> {
        let Some(me) = &self.self_id else {
            self.pending_preselect = Some(context);
            return Vec::new();
        };
        if &context.uploader_id == me {
            tracing::debug!("ignoring preselection of own listing");
            return Vec::new();
        }

        let counterpart = self
            .directory
            .find(&context.uploader_id)
            .cloned()
            .unwrap_or_else(|| context.counterpart());
        self.handle_select(counterpart).unwrap_or_default()
    }

    fn handle_select(
        &mut self,
        counterpart: Counterpart,
    ) -> Result<Vec<ConversationAction>, ClientError> {
        let me = self.self_id.clone().ok_or(ClientError::NotIdentified)?;

        let already_selected =
            self.selected().is_some_and(|current| current.user_id == counterpart.user_id);
        if already_selected && self.view_state() == ViewState::ThreadReady {
            return Ok(Vec::new());
        }

        if !already_selected {
            self.composer.cancel_edit();
        }
        Ok(vec![self.request_thread(&me, counterpart)])
    }

    fn handle_retry(&mut self) -> Result<Vec<ConversationAction>, ClientError> {
        let me = self.self_id.clone().ok_or(ClientError::NotIdentified)?;
        let Selection::Failed { counterpart, .. } = &self.selection else {
            return Err(ClientError::NothingToRetry);
        };
        let counterpart = counterpart.clone();
        Ok(vec![self.request_thread(&me, counterpart)])
    }

    fn request_thread(&mut self, me: &UserId, counterpart: Counterpart) -> ConversationAction {
        self.last_token = self.last_token.next();
        let token = self.last_token;
        let counterpart_id = counterpart.user_id.clone();

        tracing::debug!(counterpart = %counterpart_id, %token, "requesting thread");
        self.selection = Selection::Loading { counterpart, token };

        ConversationAction::Emit(Outbound::RequestThread {
            self_id: me.clone(),
            counterpart_id,
            request_id: token,
        })
    }

    fn handle_send(&mut self) -> Result<Vec<ConversationAction>, ClientError> {
        let me = self.self_id.clone().ok_or(ClientError::NotIdentified)?;
        let receiver_id = self.selected().ok_or(ClientError::NoSelection)?.user_id.clone();
        if self.composer.is_editing() {
            return Err(ClientError::EditInProgress);
        }
        let draft = self.composer.take_draft().ok_or(ClientError::EmptyDraft)?;

        Ok(vec![
            ConversationAction::Emit(Outbound::SendMessage {
                sender_id: me.clone(),
                receiver_id,
                text: draft.text,
                images: draft.images,
            }),
            ConversationAction::Emit(Outbound::RequestDirectory(me)),
        ])
    }

    fn handle_begin_edit(
        &mut self,
        message_id: &MessageId,
    ) -> Result<Vec<ConversationAction>, ClientError> {
        let message = self.own_message(message_id)?;
        let Some(text) = message.text() else {
            return Err(ClientError::NotEditable { message_id: message_id.clone() });
        };
        let text = text.to_string();
        self.composer.begin_edit(message_id.clone(), text);
        Ok(Vec::new())
    }

    fn handle_save_edit(&mut self) -> Result<Vec<ConversationAction>, ClientError> {
        let me = self.self_id.clone().ok_or(ClientError::NotIdentified)?;
        let counterpart_id = self.selected().ok_or(ClientError::NoSelection)?.user_id.clone();
        if !self.composer.is_editing() {
            return Err(ClientError::NotEditing);
        }
        let edit = self.composer.take_edit().ok_or(ClientError::EmptyEdit)?;

        Ok(vec![ConversationAction::Emit(Outbound::EditMessage {
            message_id: edit.message_id,
            new_text: edit.text,
            self_id: me,
            counterpart_id,
        })])
    }

    fn handle_delete(
        &mut self,
        message_id: &MessageId,
    ) -> Result<Vec<ConversationAction>, ClientError> {
        let me = self.self_id.clone().ok_or(ClientError::NotIdentified)?;
        self.own_message(message_id)?;
        let counterpart_id = self.selected().ok_or(ClientError::NoSelection)?.user_id.clone();

        Ok(vec![ConversationAction::Emit(Outbound::DeleteMessage {
            message_id: message_id.clone(),
            self_id: me,
            counterpart_id,
        })])
    }

    /// Message in the displayed thread, written by the local user.
    fn own_message(&self, message_id: &MessageId) -> Result<&Message, ClientError> {
        let me = self.self_id.as_ref().ok_or(ClientError::NotIdentified)?;
        let thread = self.thread().ok_or(ClientError::NoSelection)?;
        let message = thread
            .get(message_id)
            .ok_or_else(|| ClientError::MessageNotFound { message_id: message_id.clone() })?;
        if !message.is_from(me) {
            return Err(ClientError::NotOwnMessage { message_id: message_id.clone() });
        }
        Ok(message)
    }

    fn handle_relay(&mut self, inbound: Inbound) -> Vec<ConversationAction> {
        match inbound {
            Inbound::PresenceSnapshot(online) => {
                self.directory.set_presence(online);
                Vec::new()
            },
            Inbound::DirectorySnapshot(entries) => {
                self.directory.replace(entries);
                Vec::new()
            },
            Inbound::ThreadSnapshot(snapshot) => {
                self.apply_snapshot(snapshot);
                Vec::new()
            },
            Inbound::MessageReceived(message) => self.handle_message_received(message),
            Inbound::MessageUpdated(message) => {
                if let Selection::Ready { thread, .. } = &mut self.selection {
                    if !thread.update(message) {
                        tracing::debug!("update for message outside the displayed thread");
                    }
                }
                Vec::new()
            },
            Inbound::MessageDeleted { message_id } => {
                if let Selection::Ready { thread, .. } = &mut self.selection {
                    thread.remove(&message_id);
                }
                if self.composer.is_editing_message(&message_id) {
                    self.composer.cancel_edit();
                }
                Vec::new()
            },
            Inbound::RequestFailed(failure) => self.handle_request_failed(failure),
        }
    }

    fn apply_snapshot(&mut self, snapshot: ThreadSnapshot) {
        let Some(me) = self.self_id.clone() else {
            return;
        };

        let (counterpart, expected) = match &self.selection {
            Selection::Loading { counterpart, token } | Selection::Failed { counterpart, token, .. } => {
                (counterpart, *token)
            },
            Selection::None | Selection::Ready { .. } => {
                tracing::debug!(request_id = ?snapshot.request_id, "dropping unsolicited thread snapshot");
                return;
            },
        };

        let accepted = match snapshot.request_id {
            Some(token) => token == expected,
            // Uncorrelated snapshots only count while loading, and only if
            // they belong to the selected pair.
            None => {
                matches!(self.selection, Selection::Loading { .. })
                    && snapshot.messages.iter().all(|m| m.is_between(&me, &counterpart.user_id))
            },
        };
        if !accepted {
            tracing::debug!(request_id = ?snapshot.request_id, %expected, "dropping stale thread snapshot");
            return;
        }

        let counterpart = counterpart.clone();
        let thread = Thread::from_snapshot(snapshot.messages);
        tracing::debug!(counterpart = %counterpart.user_id, messages = thread.len(), "thread ready");
        self.selection = Selection::Ready { counterpart, thread };
    }

    fn handle_message_received(&mut self, message: Message) -> Vec<ConversationAction> {
        let Some(me) = self.self_id.clone() else {
            return Vec::new();
        };
        if !message.involves(&me) {
            tracing::debug!(message_id = %message.id, "dropping message for another user");
            return Vec::new();
        }

        if let Selection::Ready { counterpart, thread } = &mut self.selection {
            if message.is_between(&me, &counterpart.user_id) {
                thread.append(message);
            }
        }

        vec![ConversationAction::Emit(Outbound::RequestDirectory(me))]
    }

    fn handle_request_failed(&mut self, failure: RequestFailure) -> Vec<ConversationAction> {
        let RequestFailure { intent, request_id, reason } = failure;

        if intent != Intent::RequestThread {
            tracing::warn!(%intent, %reason, "relay refused request");
            return vec![ConversationAction::Failed { intent, reason }];
        }

        let Selection::Loading { counterpart, token } = &self.selection else {
            tracing::debug!(?request_id, "dropping thread failure outside loading");
            return Vec::new();
        };
        if request_id.is_some_and(|id| id != *token) {
            tracing::debug!(?request_id, %token, "dropping stale thread failure");
            return Vec::new();
        }

        tracing::warn!(counterpart = %counterpart.user_id, %reason, "thread load failed");
        self.selection = Selection::Failed {
            counterpart: counterpart.clone(),
            token: *token,
            reason: reason.clone(),
        };
        vec![ConversationAction::Failed { intent, reason }]
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn counterpart(id: &str) -> Counterpart {
        Counterpart::new(user(id), id.to_uppercase(), format!("{id}@example.com"))
    }

    fn message(id: &str, from: &str, to: &str, text: &str) -> Message {
        Message {
            id: MessageId::new(id).unwrap(),
            sender: user(from),
            receiver: user(to),
            text: Some(text.into()),
            images: vec![],
            edited: false,
            edited_at: None,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    fn identified() -> Coordinator {
        let mut coordinator = Coordinator::new();
        coordinator.handle(ConversationEvent::Identified { user_id: user("me") }).unwrap();
        coordinator
    }

    fn ready_with(coordinator: &mut Coordinator, other: &str, messages: Vec<Message>) {
        coordinator.handle(ConversationEvent::Select(counterpart(other))).unwrap();
        let token = coordinator.pending_token().unwrap();
        coordinator
            .handle(ConversationEvent::Relay(Inbound::ThreadSnapshot(ThreadSnapshot::correlated(
                token, messages,
            ))))
            .unwrap();
        assert_eq!(coordinator.view_state(), ViewState::ThreadReady);
    }

    fn emitted(actions: &[ConversationAction]) -> Vec<&Outbound> {
        actions
            .iter()
            .filter_map(|a| match a {
                ConversationAction::Emit(out) => Some(out),
                ConversationAction::Failed { .. } => None,
            })
            .collect()
    }

    #[test]
    fn identify_announces_and_requests_directory() {
        let mut coordinator = Coordinator::new();
        let actions =
            coordinator.handle(ConversationEvent::Identified { user_id: user("me") }).unwrap();
        assert_eq!(
            emitted(&actions),
            [&Outbound::AnnouncePresence(user("me")), &Outbound::RequestDirectory(user("me"))]
        );
    }

    #[test]
    fn select_before_identified_is_refused() {
        let mut coordinator = Coordinator::new();
        assert_eq!(
            coordinator.handle(ConversationEvent::Select(counterpart("bob"))),
            Err(ClientError::NotIdentified)
        );
    }

    #[test]
    fn select_issues_fresh_token() {
        let mut coordinator = identified();
        coordinator.handle(ConversationEvent::Select(counterpart("bob"))).unwrap();
        let first = coordinator.pending_token().unwrap();
        coordinator.handle(ConversationEvent::Select(counterpart("carol"))).unwrap();
        let second = coordinator.pending_token().unwrap();
        assert!(second > first);
    }

    #[test]
    fn reselecting_same_counterpart_is_noop() {
        let mut coordinator = identified();
        ready_with(&mut coordinator, "bob", vec![message("m1", "bob", "me", "hi")]);
        let actions = coordinator.handle(ConversationEvent::Select(counterpart("bob"))).unwrap();
        assert!(actions.is_empty());
        assert_eq!(coordinator.view_state(), ViewState::ThreadReady);
    }

    #[test]
    fn reselecting_while_loading_reissues_request() {
        let mut coordinator = identified();
        coordinator.handle(ConversationEvent::Select(counterpart("bob"))).unwrap();
        let first = coordinator.pending_token().unwrap();

        let actions = coordinator.handle(ConversationEvent::Select(counterpart("bob"))).unwrap();
        let second = coordinator.pending_token().unwrap();
        assert!(second > first);
        assert_eq!(emitted(&actions), [&Outbound::RequestThread {
            self_id: user("me"),
            counterpart_id: user("bob"),
            request_id: second,
        }]);

        // The unanswered request no longer applies.
        coordinator
            .handle(ConversationEvent::Relay(Inbound::ThreadSnapshot(ThreadSnapshot::correlated(
                first,
                vec![message("m1", "bob", "me", "late")],
            ))))
            .unwrap();
        assert_eq!(coordinator.view_state(), ViewState::LoadingThread);
    }

    #[test]
    fn reidentifying_reloads_selected_thread() {
        let mut coordinator = identified();
        ready_with(&mut coordinator, "bob", vec![message("m1", "bob", "me", "hi")]);

        let actions =
            coordinator.handle(ConversationEvent::Identified { user_id: user("me") }).unwrap();
        let token = coordinator.pending_token().unwrap();
        assert_eq!(emitted(&actions), [
            &Outbound::AnnouncePresence(user("me")),
            &Outbound::RequestDirectory(user("me")),
            &Outbound::RequestThread {
                self_id: user("me"),
                counterpart_id: user("bob"),
                request_id: token,
            },
        ]);
        assert_eq!(coordinator.view_state(), ViewState::LoadingThread);
        assert_eq!(coordinator.selected().unwrap().user_id, user("bob"));
    }

    #[test]
    fn stale_snapshot_is_dropped() {
        let mut coordinator = identified();
        coordinator.handle(ConversationEvent::Select(counterpart("bob"))).unwrap();
        let bob_token = coordinator.pending_token().unwrap();
        coordinator.handle(ConversationEvent::Select(counterpart("carol"))).unwrap();

        coordinator
            .handle(ConversationEvent::Relay(Inbound::ThreadSnapshot(ThreadSnapshot::correlated(
                bob_token,
                vec![message("m1", "bob", "me", "hi")],
            ))))
            .unwrap();

        assert_eq!(coordinator.view_state(), ViewState::LoadingThread);
        assert_eq!(coordinator.selected().unwrap().user_id, user("carol"));
    }

    #[test]
    fn bare_snapshot_for_other_pair_is_dropped() {
        let mut coordinator = identified();
        coordinator.handle(ConversationEvent::Select(counterpart("carol"))).unwrap();
        coordinator
            .handle(ConversationEvent::Relay(Inbound::ThreadSnapshot(ThreadSnapshot::bare(vec![
                message("m1", "bob", "me", "hi"),
            ]))))
            .unwrap();
        assert_eq!(coordinator.view_state(), ViewState::LoadingThread);

        coordinator
            .handle(ConversationEvent::Relay(Inbound::ThreadSnapshot(ThreadSnapshot::bare(vec![
                message("m2", "carol", "me", "hello"),
            ]))))
            .unwrap();
        assert_eq!(coordinator.view_state(), ViewState::ThreadReady);
    }

    #[test]
    fn live_message_for_other_pair_only_refreshes_directory() {
        let mut coordinator = identified();
        ready_with(&mut coordinator, "bob", vec![]);

        let actions = coordinator
            .handle(ConversationEvent::Relay(Inbound::MessageReceived(message(
                "m5", "carol", "me", "psst",
            ))))
            .unwrap();

        assert!(coordinator.thread().unwrap().is_empty());
        assert_eq!(emitted(&actions), [&Outbound::RequestDirectory(user("me"))]);
    }

    #[test]
    fn send_emits_message_then_directory_refresh() {
        let mut coordinator = identified();
        ready_with(&mut coordinator, "bob", vec![]);
        coordinator.composer_mut().set_text(" still available? ");

        let actions = coordinator.handle(ConversationEvent::Send).unwrap();
        assert_eq!(
            emitted(&actions),
            [
                &Outbound::SendMessage {
                    sender_id: user("me"),
                    receiver_id: user("bob"),
                    text: Some("still available?".into()),
                    images: vec![],
                },
                &Outbound::RequestDirectory(user("me")),
            ]
        );
        assert!(coordinator.thread().unwrap().is_empty());
    }

    #[test]
    fn empty_send_is_silent_error() {
        let mut coordinator = identified();
        ready_with(&mut coordinator, "bob", vec![]);
        let err = coordinator.handle(ConversationEvent::Send).unwrap_err();
        assert!(err.is_silent());
    }

    #[test]
    fn editing_others_message_is_refused() {
        let mut coordinator = identified();
        ready_with(&mut coordinator, "bob", vec![message("m1", "bob", "me", "hi")]);
        assert_eq!(
            coordinator.handle(ConversationEvent::BeginEdit { message_id: MessageId::new("m1").unwrap() }),
            Err(ClientError::NotOwnMessage { message_id: MessageId::new("m1").unwrap() })
        );
        assert!(!coordinator.composer().is_editing());
    }

    #[test]
    fn edit_round_trip_waits_for_relay() {
        let mut coordinator = identified();
        ready_with(&mut coordinator, "bob", vec![message("m1", "me", "bob", "old")]);
        let id = MessageId::new("m1").unwrap();

        coordinator.handle(ConversationEvent::BeginEdit { message_id: id.clone() }).unwrap();
        coordinator.composer_mut().active_text_mut().push_str(" price");
        let actions = coordinator.handle(ConversationEvent::SaveEdit).unwrap();

        assert_eq!(
            emitted(&actions),
            [&Outbound::EditMessage {
                message_id: id.clone(),
                new_text: "old price".into(),
                self_id: user("me"),
                counterpart_id: user("bob"),
            }]
        );
        assert_eq!(coordinator.thread().unwrap().get(&id).unwrap().text(), Some("old"));

        coordinator
            .handle(ConversationEvent::Relay(Inbound::MessageUpdated(message(
                "m1", "me", "bob", "old price",
            ))))
            .unwrap();
        let updated = coordinator.thread().unwrap().get(&id).unwrap();
        assert_eq!(updated.text(), Some("old price"));
        assert!(updated.edited);
    }

    #[test]
    fn deleting_edit_target_closes_edit() {
        let mut coordinator = identified();
        ready_with(&mut coordinator, "bob", vec![message("m1", "me", "bob", "old")]);
        let id = MessageId::new("m1").unwrap();
        coordinator.handle(ConversationEvent::BeginEdit { message_id: id.clone() }).unwrap();

        coordinator
            .handle(ConversationEvent::Relay(Inbound::MessageDeleted { message_id: id }))
            .unwrap();
        assert!(!coordinator.composer().is_editing());
        assert!(coordinator.thread().unwrap().is_empty());
    }

    #[test]
    fn thread_failure_then_retry() {
        let mut coordinator = identified();
        coordinator.handle(ConversationEvent::Select(counterpart("bob"))).unwrap();
        let token = coordinator.pending_token().unwrap();

        let actions = coordinator
            .handle(ConversationEvent::Relay(Inbound::RequestFailed(RequestFailure {
                intent: Intent::RequestThread,
                request_id: Some(token),
                reason: "database unavailable".into(),
            })))
            .unwrap();
        assert_eq!(coordinator.view_state(), ViewState::ThreadFailed);
        assert_eq!(coordinator.failure_reason(), Some("database unavailable"));
        assert_eq!(actions.len(), 1);

        coordinator.handle(ConversationEvent::Retry).unwrap();
        assert_eq!(coordinator.view_state(), ViewState::LoadingThread);
        assert!(coordinator.pending_token().unwrap() > token);
    }

    #[test]
    fn retry_without_failure_is_refused() {
        let mut coordinator = identified();
        assert_eq!(coordinator.handle(ConversationEvent::Retry), Err(ClientError::NothingToRetry));
    }

    #[test]
    fn preselect_waits_for_identity() {
        let mut coordinator = Coordinator::new();
        let context = NavigationContext {
            uploader_id: user("bob"),
            uploader_name: "Bob".into(),
            uploader_email: "bob@example.com".into(),
        };
        assert!(coordinator.handle(ConversationEvent::Preselect(context)).unwrap().is_empty());
        assert_eq!(coordinator.view_state(), ViewState::NoSelection);

        let actions =
            coordinator.handle(ConversationEvent::Identified { user_id: user("me") }).unwrap();
        assert_eq!(coordinator.view_state(), ViewState::LoadingThread);
        assert_eq!(coordinator.selected().unwrap().full_name, "Bob");
        assert_eq!(emitted(&actions).len(), 3);
    }

    #[test]
    fn preselecting_self_is_ignored() {
        let mut coordinator = identified();
        let context = NavigationContext {
            uploader_id: user("me"),
            uploader_name: "Me".into(),
            uploader_email: String::new(),
        };
        assert!(coordinator.handle(ConversationEvent::Preselect(context)).unwrap().is_empty());
        assert_eq!(coordinator.view_state(), ViewState::NoSelection);
    }

    #[test]
    fn identity_change_resets_selection_but_not_tokens() {
        let mut coordinator = identified();
        coordinator.handle(ConversationEvent::Select(counterpart("bob"))).unwrap();
        let token = coordinator.pending_token().unwrap();

        coordinator.handle(ConversationEvent::Identified { user_id: user("other") }).unwrap();
        assert_eq!(coordinator.view_state(), ViewState::NoSelection);

        coordinator.handle(ConversationEvent::Select(counterpart("bob"))).unwrap();
        assert!(coordinator.pending_token().unwrap() > token);
    }
}
