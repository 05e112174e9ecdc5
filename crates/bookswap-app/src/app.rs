//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the application completely decoupled from I/O and protocol
//! mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Owns the conversation [`Coordinator`] and forwards relay events to it.
//! - Tracks keyboard focus, the directory search and highlight, the
//!   highlighted message and the image viewer.
//! - Edits the composer's input line and interprets slash commands.
//! - Tracks high-level connection state for UI feedback.

use bookswap_client::{
    ClientError, ConversationAction, ConversationEvent, Coordinator, Counterpart,
    MAX_STAGED_IMAGES,
};
use bookswap_proto::{MediaBase, Message, MessageId, UserId};

use crate::{AppAction, AppEvent, Command, ConnectionState, Focus, ImageViewer, KeyInput};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Connection state.
    state: ConnectionState,
    /// Relay WebSocket URL.
    relay_url: String,
    /// Base that image references resolve against.
    media_base: MediaBase,
    /// Conversation state machine.
    conversation: Coordinator,
    /// Pane receiving keys.
    focus: Focus,
    /// Directory name filter.
    search: String,
    /// Highlighted row in the filtered directory.
    directory_cursor: usize,
    /// Highlighted message in the thread. `None` if nothing is highlighted.
    highlighted: Option<MessageId>,
    /// Cursor position in the input line, in characters.
    input_cursor: usize,
    /// Open image viewer. `None` if closed.
    viewer: Option<ImageViewer>,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create a new App for the given relay and media base.
    pub fn new(relay_url: String, media_base: MediaBase) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            relay_url,
            media_base,
            conversation: Coordinator::new(),
            focus: Focus::Directory,
            search: String::new(),
            directory_cursor: 0,
            highlighted: None,
            input_cursor: 0,
            viewer: None,
            terminal_size: (80, 24),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Connecting => {
                self.state = ConnectionState::Connecting;
                self.status_message = Some(format!("Connecting to {}...", self.relay_url));
                vec![AppAction::Render]
            },
            AppEvent::Connected => {
                self.state = ConnectionState::Connected;
                self.status_message = None;
                vec![AppAction::Render]
            },
            AppEvent::Disconnected => {
                self.state = ConnectionState::Disconnected;
                self.status_message =
                    Some("Disconnected from relay. Type /connect to reconnect.".into());
                vec![AppAction::Render]
            },
            AppEvent::Identified { user_id } => {
                self.drive(ConversationEvent::Identified { user_id })
            },
            AppEvent::Navigated(context) => self.drive(ConversationEvent::Preselect(context)),
            AppEvent::Relay(inbound) => self.drive(ConversationEvent::Relay(inbound)),
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Initiate connection to the relay.
    pub fn connect(&mut self) -> Vec<AppAction> {
        self.state = ConnectionState::Connecting;
        vec![AppAction::Connect { relay_url: self.relay_url.clone() }, AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Open the highlighted directory entry.
    pub fn select_highlighted(&mut self) -> Vec<AppAction> {
        let Some(counterpart) = self.filtered_directory().get(self.directory_cursor).copied()
        else {
            return vec![];
        };
        let counterpart = counterpart.clone();
        self.drive(ConversationEvent::Select(counterpart))
    }

    /// Submit the input line: a slash command, an edit, or a new message.
    pub fn submit(&mut self) -> Vec<AppAction> {
        if self.conversation.composer().is_editing() {
            let actions = self.drive(ConversationEvent::SaveEdit);
            self.clamp_input_cursor();
            return actions;
        }

        if let Some(parsed) = Command::parse(self.conversation.composer().text()) {
            self.conversation.composer_mut().set_text("");
            self.input_cursor = 0;
            return match parsed {
                Ok(command) => self.run_command(command),
                Err(e) => {
                    self.status_message = Some(e.to_string());
                    vec![AppAction::Render]
                },
            };
        }

        let actions = self.drive(ConversationEvent::Send);
        self.clamp_input_cursor();
        actions
    }

    /// Execute a parsed slash command.
    pub fn run_command(&mut self, command: Command) -> Vec<AppAction> {
        match command {
            Command::Search(query) => {
                self.search = query;
                self.directory_cursor = 0;
                self.focus = Focus::Directory;
                vec![AppAction::Render]
            },
            Command::Attach(images) => {
                let requested = images.len();
                let staged = self.conversation.composer_mut().stage(images);
                self.status_message = Some(if staged == requested {
                    format!("Attached {staged} image(s)")
                } else {
                    format!("Attached {staged} of {requested} image(s), limit is {MAX_STAGED_IMAGES}")
                });
                vec![AppAction::Render]
            },
            Command::Unattach(index) => {
                if self.conversation.composer_mut().unstage(index).is_none() {
                    self.status_message = Some(format!("No attached image {}", index + 1));
                }
                vec![AppAction::Render]
            },
            Command::Edit => self.edit_highlighted(),
            Command::Delete => self.delete_highlighted(),
            Command::View => self.view_highlighted(),
            Command::Retry => self.drive(ConversationEvent::Retry),
            Command::Connect => {
                if self.state == ConnectionState::Disconnected {
                    self.connect()
                } else {
                    self.status_message = Some("Already connected".into());
                    vec![AppAction::Render]
                }
            },
            Command::Quit => self.quit(),
        }
    }

    /// Start editing the highlighted message, or the latest editable one if
    /// nothing is highlighted.
    pub fn edit_highlighted(&mut self) -> Vec<AppAction> {
        let target = self.highlighted_message().map(|m| m.id.clone()).or_else(|| {
            self.conversation.thread().and_then(|thread| {
                thread
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| self.conversation.is_editable(m))
                    .map(|m| m.id.clone())
            })
        });
        let Some(message_id) = target else {
            self.status_message = Some("No message to edit".into());
            return vec![AppAction::Render];
        };

        let actions = self.drive(ConversationEvent::BeginEdit { message_id });
        if self.conversation.composer().is_editing() {
            self.focus = Focus::Composer;
            self.input_cursor = self.conversation.composer().active_text().chars().count();
        }
        actions
    }

    /// Request deletion of the highlighted message.
    pub fn delete_highlighted(&mut self) -> Vec<AppAction> {
        let Some(message_id) = self.highlighted.clone() else {
            self.status_message = Some("Highlight a message first".into());
            return vec![AppAction::Render];
        };
        self.drive(ConversationEvent::Delete { message_id })
    }

    /// Open the image viewer on the highlighted message.
    pub fn view_highlighted(&mut self) -> Vec<AppAction> {
        match self.highlighted_message().and_then(ImageViewer::open) {
            Some(viewer) => self.viewer = Some(viewer),
            None => self.status_message = Some("No images to view".into()),
        }
        vec![AppAction::Render]
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Relay WebSocket URL.
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Base that image references resolve against.
    pub fn media_base(&self) -> &MediaBase {
        &self.media_base
    }

    /// Conversation state.
    pub fn conversation(&self) -> &Coordinator {
        &self.conversation
    }

    /// Local user, once identified.
    pub fn self_id(&self) -> Option<&UserId> {
        self.conversation.self_id()
    }

    /// Pane receiving keys.
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Directory name filter.
    pub fn search_query(&self) -> &str {
        &self.search
    }

    /// Directory entries matching the search, in relay order.
    pub fn filtered_directory(&self) -> Vec<&Counterpart> {
        self.conversation.directory().filter(&self.search).collect()
    }

    /// Highlighted row in [`App::filtered_directory`].
    pub fn directory_cursor(&self) -> usize {
        self.directory_cursor
    }

    /// Highlighted message, if it is still in the thread.
    pub fn highlighted_message(&self) -> Option<&Message> {
        let id = self.highlighted.as_ref()?;
        self.conversation.thread()?.get(id)
    }

    /// Text of the input line.
    pub fn input_text(&self) -> &str {
        self.conversation.composer().active_text()
    }

    /// Cursor position in the input line, in characters.
    pub fn input_cursor(&self) -> usize {
        self.input_cursor
    }

    /// Open image viewer. `None` if closed.
    pub fn viewer(&self) -> Option<&ImageViewer> {
        self.viewer.as_ref()
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Feed an event to the coordinator and translate the result.
    fn drive(&mut self, event: ConversationEvent) -> Vec<AppAction> {
        let selected_before = self.conversation.selected().map(|c| c.user_id.clone());

        let mut actions = Vec::new();
        match self.conversation.handle(event) {
            Ok(conversation_actions) => {
                for action in conversation_actions {
                    match action {
                        ConversationAction::Emit(outbound) => {
                            actions.push(AppAction::Emit(outbound));
                        },
                        ConversationAction::Failed { intent, reason } => {
                            self.status_message = Some(format!("Could not {intent}: {reason}"));
                        },
                    }
                }
            },
            Err(e) => self.report(&e),
        }

        let selected_after = self.conversation.selected().map(|c| c.user_id.clone());
        if selected_before != selected_after {
            self.highlighted = None;
            self.viewer = None;
            if selected_after.is_some() {
                self.focus = Focus::Composer;
            }
        }
        self.reconcile();

        actions.push(AppAction::Render);
        actions
    }

    fn report(&mut self, error: &ClientError) {
        if error.is_silent() {
            return;
        }
        self.status_message = Some(error.to_string());
    }

    /// Drop UI references to state the coordinator no longer holds.
    fn reconcile(&mut self) {
        if self.highlighted.is_some() && self.highlighted_message().is_none() {
            self.highlighted = None;
        }

        let viewer_gone = self.viewer.as_ref().is_some_and(|viewer| {
            self.conversation.thread().and_then(|t| t.get(viewer.message_id())).is_none()
        });
        if viewer_gone {
            self.viewer = None;
        }

        let rows = self.filtered_directory().len();
        self.directory_cursor = self.directory_cursor.min(rows.saturating_sub(1));
        self.clamp_input_cursor();
    }

    fn clamp_input_cursor(&mut self) {
        let len = self.input_text().chars().count();
        self.input_cursor = self.input_cursor.min(len);
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        if self.viewer.is_some() {
            return self.handle_viewer_key(key);
        }

        match key {
            KeyInput::Tab => {
                self.focus = self.focus.next();
                vec![AppAction::Render]
            },
            KeyInput::Esc => {
                if self.conversation.composer().is_editing() {
                    let actions = self.drive(ConversationEvent::CancelEdit);
                    self.clamp_input_cursor();
                    actions
                } else {
                    self.quit()
                }
            },
            _ => match self.focus {
                Focus::Directory => self.handle_directory_key(key),
                Focus::Thread => self.handle_thread_key(key),
                Focus::Composer => self.handle_composer_key(key),
            },
        }
    }

    fn handle_viewer_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Esc => self.viewer = None,
            KeyInput::Left | KeyInput::Up => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.previous();
                }
            },
            KeyInput::Right | KeyInput::Down => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.next();
                }
            },
            _ => return vec![],
        }
        vec![AppAction::Render]
    }

    fn handle_directory_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Up => {
                self.directory_cursor = self.directory_cursor.saturating_sub(1);
            },
            KeyInput::Down => {
                let rows = self.filtered_directory().len();
                if self.directory_cursor + 1 < rows {
                    self.directory_cursor += 1;
                }
            },
            KeyInput::Enter => return self.select_highlighted(),
            KeyInput::Char(c) => {
                self.search.push(c);
                self.directory_cursor = 0;
            },
            KeyInput::Backspace => {
                self.search.pop();
                self.directory_cursor = 0;
            },
            _ => return vec![],
        }
        vec![AppAction::Render]
    }

    fn handle_thread_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Up => self.move_highlight(true),
            KeyInput::Down => self.move_highlight(false),
            KeyInput::Enter | KeyInput::Char('v') => return self.view_highlighted(),
            KeyInput::Char('e') => return self.edit_highlighted(),
            KeyInput::Delete | KeyInput::Char('d') => return self.delete_highlighted(),
            _ => return vec![],
        }
        vec![AppAction::Render]
    }

    fn handle_composer_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        let cursor = self.input_cursor;
        let text = self.conversation.composer_mut().active_text_mut();
        let len = text.chars().count();

        match key {
            KeyInput::Char(c) => {
                text.insert(byte_offset(text, cursor), c);
                self.input_cursor += 1;
            },
            KeyInput::Backspace => {
                if cursor > 0 {
                    text.remove(byte_offset(text, cursor - 1));
                    self.input_cursor -= 1;
                }
            },
            KeyInput::Delete => {
                if cursor < len {
                    text.remove(byte_offset(text, cursor));
                }
            },
            KeyInput::Left => self.input_cursor = cursor.saturating_sub(1),
            KeyInput::Right => self.input_cursor = (cursor + 1).min(len),
            KeyInput::Home => self.input_cursor = 0,
            KeyInput::End => self.input_cursor = len,
            KeyInput::Up => self.move_highlight(true),
            KeyInput::Down => self.move_highlight(false),
            KeyInput::Enter => return self.submit(),
            KeyInput::Tab | KeyInput::Esc => return vec![],
        }
        vec![AppAction::Render]
    }

    /// Move the message highlight. Moving down past the newest message
    /// clears it.
    fn move_highlight(&mut self, up: bool) {
        let Some(thread) = self.conversation.thread() else {
            return;
        };
        let messages = thread.messages();
        let current =
            self.highlighted.as_ref().and_then(|id| messages.iter().position(|m| &m.id == id));

        let next = match (current, up) {
            (None, true) => messages.len().checked_sub(1),
            (None, false) => None,
            (Some(i), true) => Some(i.saturating_sub(1)),
            (Some(i), false) => (i + 1 < messages.len()).then_some(i + 1),
        };
        self.highlighted = next.map(|i| messages[i].id.clone());
    }
}

/// Byte offset of the `chars`-th character, or the end of `text`.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}
