//! End-to-end tests of the generic runtime against the in-memory relay.
//!
//! # Test Strategy
//!
//! Each test scripts what a user does in the terminal client:
//! 1. Queue keys and relay-side steps on a [`SimDriver`]
//! 2. Run the same [`Runtime`] the terminal binary runs
//! 3. Verify App state and relay state once the script ends
//!
//! Every render is checked against the standard invariants, so a run that
//! returns `Ok` never passed through an invalid state.

use bookswap_app::{AppEvent, ConnectionState, KeyInput, Runtime};
use bookswap_client::{NavigationContext, ViewState};
use bookswap_harness::{
    ClientSnapshot, ConnectionId, InvariantRegistry, SharedSimRelay, SimDriver, SimStep,
    create_shared_relay,
};
use bookswap_proto::{Intent, MediaBase, Outbound, UserId};

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn relay_with_profiles() -> SharedSimRelay {
    let relay = create_shared_relay();
    {
        let mut relay = relay.lock().unwrap();
        relay.register(user("alice"), "Alice Reader", "alice@example.com");
        relay.register(user("bob"), "Bob Seller", "bob@example.com");
        relay.register(user("carol"), "Carol Seller", "carol@example.com");
    }
    relay
}

/// Open a peer connection on the relay and announce it.
fn peer(relay: &SharedSimRelay, id: &str) -> ConnectionId {
    let mut relay = relay.lock().unwrap();
    let connection = relay.open();
    relay.handle(connection, Outbound::AnnouncePresence(user(id)));
    connection
}

fn send(from: &str, to: &str, text: &str) -> Outbound {
    Outbound::SendMessage {
        sender_id: user(from),
        receiver_id: user(to),
        text: Some(text.into()),
        images: vec![],
    }
}

fn alice_driver(relay: &SharedSimRelay) -> SimDriver {
    SimDriver::new().with_relay(relay.clone()).with_invariants(InvariantRegistry::standard())
}

fn alice_runtime(driver: SimDriver) -> Runtime<SimDriver> {
    Runtime::new(driver, user("alice"), "ws://sim/chat".into(), MediaBase::new("http://media"))
}

fn thread_texts(runtime: &Runtime<SimDriver>) -> Vec<String> {
    runtime
        .app()
        .conversation()
        .thread()
        .map(|thread| thread.messages().iter().filter_map(|m| m.text.clone()).collect())
        .unwrap_or_default()
}

fn requested_threads(relay: &SharedSimRelay) -> usize {
    relay
        .lock()
        .unwrap()
        .received()
        .iter()
        .filter(|(_, event)| event.intent() == Intent::RequestThread)
        .count()
}

#[tokio::test]
async fn two_users_exchange_messages() {
    let relay = relay_with_profiles();
    let bob = peer(&relay, "bob");
    relay.lock().unwrap().handle(bob, send("bob", "alice", "Is the book still available?"));

    let driver = alice_driver(&relay);
    driver.inject_event(AppEvent::Tick);
    driver.inject_keys([KeyInput::Enter]);
    driver.type_line("Yes, still available");
    driver.push(SimStep::Peer { connection: bob, event: send("bob", "alice", "Great") });
    driver.inject_event(AppEvent::Tick);

    let mut runtime = alice_runtime(driver);
    runtime.run().await.unwrap();

    let conversation = runtime.app().conversation();
    assert_eq!(conversation.view_state(), ViewState::ThreadReady);
    assert_eq!(conversation.selected().unwrap().full_name, "Bob Seller");
    assert_eq!(thread_texts(&runtime), [
        "Is the book still available?",
        "Yes, still available",
        "Great"
    ]);
    assert_eq!(relay.lock().unwrap().messages().len(), 3);
}

#[tokio::test]
async fn incoming_message_refreshes_directory_preview() {
    let relay = relay_with_profiles();
    let bob = peer(&relay, "bob");
    relay.lock().unwrap().handle(bob, send("bob", "alice", "hello"));

    let driver = alice_driver(&relay);
    driver.inject_event(AppEvent::Tick);
    driver.push(SimStep::Peer { connection: bob, event: send("bob", "alice", "still there?") });
    driver.inject_event(AppEvent::Tick);

    let mut runtime = alice_runtime(driver);
    runtime.run().await.unwrap();

    let directory = runtime.app().conversation().directory();
    assert_eq!(directory.entries()[0].last_message, "still there?");
    assert!(runtime.app().conversation().is_online(&user("bob")));
}

#[tokio::test]
async fn navigation_preselects_uploader() {
    let relay = relay_with_profiles();

    let driver = alice_driver(&relay);
    driver.inject_event(AppEvent::Tick);

    let mut runtime = alice_runtime(driver).with_navigation(NavigationContext {
        uploader_id: user("carol"),
        uploader_name: "Carol Seller".into(),
        uploader_email: "carol@example.com".into(),
    });
    runtime.run().await.unwrap();

    assert_eq!(requested_threads(&relay), 1);
    insta::assert_json_snapshot!(ClientSnapshot::from_app(runtime.app()), @r#"
    {
      "self_id": "alice",
      "view_state": "thread-ready",
      "selected": "carol",
      "thread": [],
      "staged_images": 0,
      "editing": null,
      "directory_rows": 0,
      "directory_cursor": 0,
      "highlighted": null,
      "viewer": null
    }
    "#);
}

#[tokio::test]
async fn late_reply_for_previous_selection_is_dropped() {
    let relay = relay_with_profiles();
    let bob = peer(&relay, "bob");
    let carol = peer(&relay, "carol");
    {
        let mut relay = relay.lock().unwrap();
        relay.handle(bob, send("bob", "alice", "from bob"));
        relay.handle(carol, send("carol", "alice", "from carol"));
        relay.hold_thread_replies(true);
    }

    let driver = alice_driver(&relay);
    driver.inject_event(AppEvent::Tick);
    // Directory is [carol, bob]: open carol, then switch to bob before
    // either reply arrives.
    driver.inject_keys([KeyInput::Enter, KeyInput::Tab, KeyInput::Down, KeyInput::Enter]);
    driver.push(SimStep::ReleaseHeld);
    driver.inject_event(AppEvent::Tick);

    let mut runtime = alice_runtime(driver);
    runtime.run().await.unwrap();

    let conversation = runtime.app().conversation();
    assert_eq!(conversation.selected().unwrap().user_id, user("bob"));
    assert_eq!(conversation.view_state(), ViewState::ThreadReady);
    assert_eq!(thread_texts(&runtime), ["from bob"]);
    assert_eq!(requested_threads(&relay), 2);
}

#[tokio::test]
async fn failed_thread_load_is_reported() {
    let relay = relay_with_profiles();
    let bob = peer(&relay, "bob");
    {
        let mut relay = relay.lock().unwrap();
        relay.handle(bob, send("bob", "alice", "hello"));
        relay.fail_next(Intent::RequestThread, "database unavailable");
    }

    let driver = alice_driver(&relay);
    driver.inject_event(AppEvent::Tick);
    driver.inject_keys([KeyInput::Enter]);
    driver.inject_event(AppEvent::Tick);

    let mut runtime = alice_runtime(driver);
    runtime.run().await.unwrap();

    let app = runtime.app();
    assert_eq!(app.conversation().view_state(), ViewState::ThreadFailed);
    assert_eq!(app.conversation().failure_reason(), Some("database unavailable"));
    assert_eq!(app.status_message(), Some("Could not load messages: database unavailable"));
    assert!(thread_texts(&runtime).is_empty());
}

#[tokio::test]
async fn failed_thread_load_can_be_retried() {
    let relay = relay_with_profiles();
    let bob = peer(&relay, "bob");
    {
        let mut relay = relay.lock().unwrap();
        relay.handle(bob, send("bob", "alice", "hello"));
        relay.fail_next(Intent::RequestThread, "database unavailable");
    }

    let driver = alice_driver(&relay);
    driver.inject_event(AppEvent::Tick);
    driver.inject_keys([KeyInput::Enter]);
    driver.inject_event(AppEvent::Tick);
    driver.type_line("/retry");
    driver.inject_event(AppEvent::Tick);

    let mut runtime = alice_runtime(driver);
    runtime.run().await.unwrap();

    assert_eq!(runtime.app().conversation().view_state(), ViewState::ThreadReady);
    assert_eq!(thread_texts(&runtime), ["hello"]);
    assert_eq!(requested_threads(&relay), 2);
}

#[tokio::test]
async fn dropped_connection_is_surfaced() {
    let relay = relay_with_profiles();

    let driver = alice_driver(&relay);
    driver.inject_event(AppEvent::Tick);
    driver.push(SimStep::DropConnection);
    driver.inject_event(AppEvent::Tick);

    let mut runtime = alice_runtime(driver);
    runtime.run().await.unwrap();

    assert_eq!(runtime.app().connection_state(), ConnectionState::Disconnected);
    assert!(runtime.app().status_message().unwrap().contains("/connect"));
    assert!(relay.lock().unwrap().online().is_empty());
}

#[tokio::test]
async fn reconnect_announces_again_and_reloads_thread() {
    let relay = relay_with_profiles();
    let bob = peer(&relay, "bob");
    relay.lock().unwrap().handle(bob, send("bob", "alice", "hello"));

    let driver = alice_driver(&relay);
    driver.inject_event(AppEvent::Tick);
    driver.inject_keys([KeyInput::Enter]);
    driver.push(SimStep::DropConnection);
    driver.inject_event(AppEvent::Tick);
    driver.type_line("/connect");
    driver.inject_event(AppEvent::Tick);

    let mut runtime = alice_runtime(driver);
    runtime.run().await.unwrap();

    let announcements = relay
        .lock()
        .unwrap()
        .received()
        .iter()
        .filter(|(_, event)| event.intent() == Intent::AnnouncePresence)
        .count();
    // bob once, alice on connect and on reconnect
    assert_eq!(announcements, 3);
    // the open conversation is fetched again over the new connection
    assert_eq!(requested_threads(&relay), 2);
    assert_eq!(runtime.app().connection_state(), ConnectionState::Connected);
    assert_eq!(runtime.app().conversation().selected().unwrap().user_id, user("bob"));
    assert_eq!(thread_texts(&runtime), ["hello"]);
}

#[tokio::test]
async fn refused_connection_is_reported() {
    let relay = relay_with_profiles();
    let driver = alice_driver(&relay);
    driver.refuse_connections(true);

    let mut runtime = alice_runtime(driver);
    runtime.run().await.unwrap();

    let app = runtime.app();
    assert_eq!(app.connection_state(), ConnectionState::Disconnected);
    assert_eq!(app.self_id(), None);
    assert!(app.status_message().unwrap().starts_with("Error: connect failed"));
    assert!(runtime.driver().renders() > 0);
}
