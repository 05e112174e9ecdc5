//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: Transport binding to the relay
//! - [`Driver`]: Platform-specific I/O

use bookswap_client::NavigationContext;
use bookswap_proto::{MediaBase, UserId};

use crate::{App, AppAction, AppEvent, Bridge, Driver};

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
pub struct Runtime<D: Driver> {
    driver: D,
    app: App,
    bridge: Bridge,
    self_id: UserId,
    navigation: Option<NavigationContext>,
}

impl<D: Driver> Runtime<D> {
    /// Create a new runtime for `self_id` talking to `relay_url`.
    pub fn new(driver: D, self_id: UserId, relay_url: String, media_base: MediaBase) -> Self {
        let app = App::new(relay_url, media_base);
        Self { driver, app, bridge: Bridge::new(), self_id, navigation: None }
    }

    /// Open the chat with a book uploader preselected.
    #[must_use]
    pub fn with_navigation(mut self, context: NavigationContext) -> Self {
        self.navigation = Some(context);
        self
    }

    /// Run the main event loop.
    ///
    /// This is the core orchestration loop that:
    /// 1. Polls for input events from the driver
    /// 2. Receives relay events and decodes them through the bridge
    /// 3. Processes actions and events between App and Bridge
    /// 4. Sends outgoing events through the driver
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        let mut actions = Vec::new();
        if let Some(context) = self.navigation.take() {
            actions.extend(self.app.handle(AppEvent::Navigated(context)));
        }
        actions.extend(self.connect().await?);

        if !self.process_actions(actions).await? {
            loop {
                let should_quit = self.process_cycle().await?;
                if should_quit {
                    break;
                }
            }
        }

        self.bridge.unmount();
        self.driver.stop();
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event().await? {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }

        if self.driver.is_connected() {
            while let Some(text) = self.driver.recv_text().await {
                let events = self.bridge.handle_text(&text);
                if self.process_bridge_events(events).await? {
                    return Ok(true);
                }
            }

            if !self.driver.is_connected() {
                tracing::info!("relay connection closed");
                self.bridge.unmount();
                let actions = self.app.handle(AppEvent::Disconnected);
                if self.process_actions(actions).await? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),
                    AppAction::Connect { relay_url: _ } => {
                        pending_actions.extend(self.connect().await?);
                    },

                    // Relay traffic goes through the bridge
                    AppAction::Emit(_) => {
                        let events = self.bridge.process_app_action(action);
                        for event in events {
                            let new_actions = self.app.handle(event);
                            pending_actions.extend(new_actions);
                        }
                        self.send_outgoing().await?;
                    },
                }
            }
        }
        Ok(false)
    }

    /// Process events from Bridge back to App.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        for event in events {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Connect to the relay and mount the binding for the local user.
    ///
    /// A failed connection is reported to the App rather than returned, so
    /// the user can retry with `/connect`.
    async fn connect(&mut self) -> Result<Vec<AppAction>, D::Error> {
        let _ = self.app.handle(AppEvent::Connecting);
        self.driver.render(&self.app)?;

        let relay_url = self.app.relay_url().to_string();
        if let Err(e) = self.driver.connect(&relay_url).await {
            tracing::warn!(%relay_url, "connect failed: {e}");
            let mut actions = self.app.handle(AppEvent::Disconnected);
            actions.extend(self.app.handle(AppEvent::Error { message: format!("connect failed: {e}") }));
            return Ok(actions);
        }

        tracing::info!(%relay_url, "connected to relay");
        self.bridge.mount(self.self_id.clone());
        let mut actions = self.app.handle(AppEvent::Connected);
        actions.extend(self.app.handle(AppEvent::Identified { user_id: self.self_id.clone() }));
        Ok(actions)
    }

    /// Send all pending outgoing text to the relay.
    async fn send_outgoing(&mut self) -> Result<(), D::Error> {
        let texts = self.bridge.take_outgoing();
        for text in texts {
            self.driver.send_text(text).await?;
        }
        Ok(())
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// Get a reference to the driver
    pub fn driver(&self) -> &D {
        &self.driver
    }
}
