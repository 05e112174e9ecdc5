//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`bookswap_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Input is a script of [`SimStep`]s. With a [`SharedSimRelay`] attached,
//! outgoing text is handed to the relay and incoming text is drained from the
//! relay outbox; without one, text is captured and injected by hand.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use bookswap_app::{App, AppEvent, Driver, KeyInput};
use bookswap_proto::Outbound;

use crate::{
    invariants::{ClientSnapshot, InvariantRegistry, SystemSnapshot},
    sim_relay::{ConnectionId, SharedSimRelay, lock},
};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// One scripted step, consumed per [`Driver::poll_event`].
#[derive(Debug, Clone)]
pub enum SimStep {
    /// Deliver an event to the App.
    Event(AppEvent),
    /// Another client sends an event to the relay.
    Peer {
        /// Connection the peer uses.
        connection: ConnectionId,
        /// Event it sends.
        event: Outbound,
    },
    /// Release thread replies the relay is holding.
    ReleaseHeld,
    /// The relay drops this driver's connection.
    DropConnection,
}

/// Shared state for step injection.
///
/// This allows injection from outside async contexts.
#[derive(Default)]
struct SharedState {
    steps: VecDeque<SimStep>,
    incoming: VecDeque<String>,
    outgoing: Vec<String>,
    connected: bool,
    dropped: bool,
    refuse_connect: bool,
    renders: usize,
    last_snapshot: Option<ClientSnapshot>,
}

/// Simulation driver for deterministic testing.
///
/// Once the script is exhausted the driver presses Esc, so a run always
/// ends: Esc closes the viewer, then cancels an edit, then quits.
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    relay: Option<SharedSimRelay>,
    connection: Option<ConnectionId>,
    invariants: Option<InvariantRegistry>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Create a new simulation driver.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SharedState::default())),
            relay: None,
            connection: None,
            invariants: None,
        }
    }

    /// Talk to a shared in-memory relay.
    #[must_use]
    pub fn with_relay(mut self, relay: SharedSimRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Append a step to the script.
    pub fn push(&self, step: SimStep) {
        lock(&self.state).steps.push_back(step);
    }

    /// Append an `AppEvent` to the script.
    pub fn inject_event(&self, event: AppEvent) {
        self.push(SimStep::Event(event));
    }

    /// Append key presses to the script.
    pub fn inject_keys(&self, keys: impl IntoIterator<Item = KeyInput>) {
        for key in keys {
            self.inject_event(AppEvent::Key(key));
        }
    }

    /// Append typing `text` followed by Enter.
    pub fn type_line(&self, text: &str) {
        self.inject_keys(text.chars().map(KeyInput::Char).chain([KeyInput::Enter]));
    }

    /// Queue text as if received from the relay. Only used without a relay.
    pub fn inject_text(&self, text: impl Into<String>) {
        lock(&self.state).incoming.push_back(text.into());
    }

    /// Take all captured outgoing text.
    pub fn take_outgoing(&self) -> Vec<String> {
        std::mem::take(&mut lock(&self.state).outgoing)
    }

    /// Check if there are pending steps or text to process.
    pub fn has_pending(&self) -> bool {
        let state = lock(&self.state);
        !state.steps.is_empty() || !state.incoming.is_empty()
    }

    /// Make subsequent connection attempts fail.
    pub fn refuse_connections(&self, refuse: bool) {
        lock(&self.state).refuse_connect = refuse;
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        lock(&self.state).renders
    }

    /// Snapshot taken at the last render.
    pub fn last_snapshot(&self) -> Option<ClientSnapshot> {
        lock(&self.state).last_snapshot.clone()
    }

    /// Relay connection currently in use.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    /// Check invariants against App state.
    pub fn check_invariants(&self, app: &App) -> Result<(), SimDriverError> {
        let Some(registry) = &self.invariants else { return Ok(()) };
        registry.check_all(&SystemSnapshot::from_app(app)).map_err(|violations| {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            SimDriverError(format!("invariant violation: {}", messages.join("; ")))
        })
    }

    fn run_step(&mut self, step: SimStep) -> Option<AppEvent> {
        match step {
            SimStep::Event(event) => return Some(event),
            SimStep::Peer { connection, event } => {
                if let Some(relay) = &self.relay {
                    lock(relay).handle(connection, event);
                }
            },
            SimStep::ReleaseHeld => {
                if let Some(relay) = &self.relay {
                    let released = lock(relay).release_thread_replies();
                    tracing::debug!(released, "released held thread replies");
                }
            },
            SimStep::DropConnection => {
                self.close_connection();
                lock(&self.state).dropped = true;
            },
        }
        Some(AppEvent::Tick)
    }

    fn close_connection(&mut self) {
        if let (Some(relay), Some(connection)) = (&self.relay, self.connection.take()) {
            lock(relay).close(connection);
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        let step = lock(&self.state).steps.pop_front();
        match step {
            Some(step) => Ok(self.run_step(step)),
            None => Ok(Some(AppEvent::Key(KeyInput::Esc))),
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), Self::Error> {
        if !lock(&self.state).connected {
            return Err(SimDriverError("not connected".into()));
        }
        if let (Some(relay), Some(connection)) = (&self.relay, self.connection) {
            lock(relay)
                .receive(connection, &text)
                .map_err(|e| SimDriverError(format!("relay rejected text: {e}")))?;
        }
        lock(&self.state).outgoing.push(text);
        Ok(())
    }

    async fn recv_text(&mut self) -> Option<String> {
        {
            let mut state = lock(&self.state);
            if state.dropped {
                state.dropped = false;
                state.connected = false;
                return None;
            }
            if self.relay.is_none() {
                return state.incoming.pop_front();
            }
        }
        let (relay, connection) = (self.relay.as_ref()?, self.connection?);
        lock(relay).pop_outbox(connection)
    }

    async fn connect(&mut self, _relay_url: &str) -> Result<(), Self::Error> {
        if lock(&self.state).refuse_connect {
            return Err(SimDriverError("connection refused".into()));
        }
        self.close_connection();
        if let Some(relay) = &self.relay {
            self.connection = Some(lock(relay).open());
        }
        let mut state = lock(&self.state);
        state.connected = true;
        state.dropped = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        {
            let mut state = lock(&self.state);
            state.renders += 1;
            state.last_snapshot = Some(ClientSnapshot::from_app(app));
        }
        self.check_invariants(app)
    }

    fn stop(&mut self) {
        self.close_connection();
        lock(&self.state).connected = false;
    }
}
