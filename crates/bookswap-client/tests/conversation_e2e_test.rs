//! End-to-end conversation scenarios.
//!
//! Each test drives a coordinator through a complete user flow and checks the
//! emitted relay events alongside the resulting view.

use bookswap_client::{
    ClientError, ConversationAction, ConversationEvent, Coordinator, Counterpart, Directory,
    ImageRef, Inbound, Message, MessageId, Outbound, RequestToken, UserId, ViewState,
};
use bookswap_proto::ThreadSnapshot;
use chrono::DateTime;

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn id(raw: &str) -> MessageId {
    MessageId::new(raw).unwrap()
}

fn text_message(raw_id: &str, from: &str, to: &str, text: &str) -> Message {
    Message {
        id: id(raw_id),
        sender: user(from),
        receiver: user(to),
        text: Some(text.to_string()),
        images: vec![],
        edited: false,
        edited_at: None,
        created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    }
}

fn image_message(raw_id: &str, from: &str, to: &str) -> Message {
    Message {
        text: None,
        images: vec![ImageRef::new("uploads/cover.jpg")],
        ..text_message(raw_id, from, to, "")
    }
}

fn relay(coordinator: &mut Coordinator, inbound: Inbound) -> Vec<ConversationAction> {
    coordinator.handle(ConversationEvent::Relay(inbound)).unwrap()
}

fn thread_ids(coordinator: &Coordinator) -> Vec<String> {
    coordinator.thread().unwrap().messages().iter().map(|m| m.id.to_string()).collect()
}

fn identified(me: &str) -> Coordinator {
    let mut coordinator = Coordinator::new();
    coordinator.handle(ConversationEvent::Identified { user_id: user(me) }).unwrap();
    coordinator
}

fn select(coordinator: &mut Coordinator, other: &str) -> RequestToken {
    let actions = coordinator
        .handle(ConversationEvent::Select(Counterpart::new(user(other), other, "")))
        .unwrap();
    let [ConversationAction::Emit(Outbound::RequestThread { request_id, .. })] = actions.as_slice()
    else {
        panic!("expected a single thread request, got {actions:?}");
    };
    *request_id
}

#[test]
fn select_load_receive_delete() {
    let mut coordinator = identified("me");

    let actions = coordinator
        .handle(ConversationEvent::Select(Counterpart::new(user("u"), "Uma", "")))
        .unwrap();
    let token = coordinator.pending_token().unwrap();
    assert_eq!(
        actions,
        [ConversationAction::Emit(Outbound::RequestThread {
            self_id: user("me"),
            counterpart_id: user("u"),
            request_id: token,
        })]
    );
    assert_eq!(coordinator.view_state(), ViewState::LoadingThread);

    relay(
        &mut coordinator,
        Inbound::ThreadSnapshot(ThreadSnapshot::correlated(token, vec![
            text_message("m1", "u", "me", "hi"),
            text_message("m2", "me", "u", "hello"),
        ])),
    );
    assert_eq!(coordinator.view_state(), ViewState::ThreadReady);
    assert_eq!(thread_ids(&coordinator), ["m1", "m2"]);

    relay(&mut coordinator, Inbound::MessageReceived(text_message("m3", "u", "me", "deal?")));
    assert_eq!(thread_ids(&coordinator), ["m1", "m2", "m3"]);

    let actions =
        coordinator.handle(ConversationEvent::Delete { message_id: id("m2") }).unwrap();
    assert_eq!(
        actions,
        [ConversationAction::Emit(Outbound::DeleteMessage {
            message_id: id("m2"),
            self_id: user("me"),
            counterpart_id: user("u"),
        })]
    );
    assert_eq!(thread_ids(&coordinator), ["m1", "m2", "m3"]);

    relay(&mut coordinator, Inbound::MessageDeleted { message_id: id("m2") });
    assert_eq!(thread_ids(&coordinator), ["m1", "m3"]);
}

#[test]
fn switching_counterpart_clears_thread_before_new_data() {
    let mut coordinator = identified("me");
    let first = select(&mut coordinator, "c1");
    relay(
        &mut coordinator,
        Inbound::ThreadSnapshot(ThreadSnapshot::correlated(first, vec![text_message(
            "m1", "c1", "me", "hi",
        )])),
    );
    assert_eq!(thread_ids(&coordinator), ["m1"]);

    select(&mut coordinator, "c2");
    assert_eq!(coordinator.view_state(), ViewState::LoadingThread);
    assert!(coordinator.thread().is_none());

    // Live messages for the new pair wait for the snapshot.
    relay(&mut coordinator, Inbound::MessageReceived(text_message("m2", "c2", "me", "early")));
    assert!(coordinator.thread().is_none());
}

#[test]
fn send_rejected_without_content_or_selection() {
    let mut coordinator = identified("me");
    coordinator.composer_mut().set_text("hello");
    assert_eq!(coordinator.handle(ConversationEvent::Send), Err(ClientError::NoSelection));
    assert_eq!(coordinator.composer().text(), "hello");

    select(&mut coordinator, "u");
    coordinator.composer_mut().set_text("   ");
    assert_eq!(coordinator.handle(ConversationEvent::Send), Err(ClientError::EmptyDraft));
}

#[test]
fn image_only_send_carries_no_text() {
    let mut coordinator = identified("me");
    select(&mut coordinator, "u");
    coordinator.composer_mut().stage([ImageRef::new("uploads/a.jpg")]);

    let actions = coordinator.handle(ConversationEvent::Send).unwrap();
    let ConversationAction::Emit(Outbound::SendMessage { text, images, .. }) = &actions[0] else {
        panic!("expected sendMessage, got {actions:?}");
    };
    assert_eq!(text, &None);
    assert_eq!(images, &[ImageRef::new("uploads/a.jpg")]);
    assert!(coordinator.composer().staged().is_empty());
}

#[test]
fn edit_refused_for_others_and_image_only_messages() {
    let mut coordinator = identified("me");
    let token = select(&mut coordinator, "u");
    relay(
        &mut coordinator,
        Inbound::ThreadSnapshot(ThreadSnapshot::correlated(token, vec![
            text_message("theirs", "u", "me", "hi"),
            image_message("picture", "me", "u"),
            text_message("mine", "me", "u", "hello"),
        ])),
    );

    assert_eq!(
        coordinator.handle(ConversationEvent::BeginEdit { message_id: id("theirs") }),
        Err(ClientError::NotOwnMessage { message_id: id("theirs") })
    );
    assert_eq!(
        coordinator.handle(ConversationEvent::BeginEdit { message_id: id("picture") }),
        Err(ClientError::NotEditable { message_id: id("picture") })
    );
    assert_eq!(
        coordinator.handle(ConversationEvent::Delete { message_id: id("theirs") }),
        Err(ClientError::NotOwnMessage { message_id: id("theirs") })
    );
    assert!(!coordinator.composer().is_editing());

    coordinator.handle(ConversationEvent::BeginEdit { message_id: id("mine") }).unwrap();
    assert_eq!(coordinator.composer().active_text(), "hello");
    assert_eq!(coordinator.handle(ConversationEvent::Send), Err(ClientError::EditInProgress));
}

#[test]
fn directory_filter_matches_names_ignoring_case() {
    let mut directory = Directory::default();
    directory.replace(
        ["Alice", "bob", "ALICE2"]
            .iter()
            .enumerate()
            .map(|(i, name)| Counterpart::new(user(&format!("u{i}")), *name, ""))
            .collect(),
    );

    let names: Vec<_> = directory.filter("ali").map(|c| c.full_name.as_str()).collect();
    assert_eq!(names, ["Alice", "ALICE2"]);
}

#[test]
fn incoming_message_refreshes_directory_even_without_selection() {
    let mut coordinator = identified("me");
    let actions =
        relay(&mut coordinator, Inbound::MessageReceived(text_message("m1", "u", "me", "hi")));
    assert_eq!(actions, [ConversationAction::Emit(Outbound::RequestDirectory(user("me")))]);
    assert_eq!(coordinator.view_state(), ViewState::NoSelection);
}
