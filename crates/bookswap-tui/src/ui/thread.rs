//! Thread pane
//!
//! Messages with the selected counterpart, or the image viewer when open.

use bookswap_app::{App, Focus, ImageViewer};
use bookswap_client::ViewState;
use bookswap_proto::Message;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

/// Render the thread pane.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(viewer) = app.viewer() {
        render_viewer(frame, app, viewer, area);
        return;
    }

    let conversation = app.conversation();
    let title = conversation.selected().map_or_else(
        || " No conversation ".to_string(),
        |counterpart| {
            let presence =
                if conversation.is_online(&counterpart.user_id) { "online" } else { "offline" };
            format!(" {} ({presence}) ", counterpart.full_name)
        },
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(super::border_style(app, Focus::Thread));

    let placeholder = match conversation.view_state() {
        ViewState::NoSelection => Some("Select a conversation to start chatting".to_string()),
        ViewState::LoadingThread => Some("Loading messages...".to_string()),
        ViewState::ThreadFailed => Some(format!(
            "Could not load messages: {}. Type /retry to try again.",
            conversation.failure_reason().unwrap_or("unknown error")
        )),
        ViewState::ThreadReady => None,
    };
    let messages = conversation.thread().map(|thread| thread.messages()).unwrap_or_default();

    if let Some(text) = placeholder.or_else(|| {
        messages.is_empty().then(|| "No messages yet. Say hello!".to_string())
    }) {
        let paragraph = Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray)))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let highlighted = app.highlighted_message().map(|m| &m.id);
    let items: Vec<ListItem> = messages.iter().map(|message| message_item(app, message)).collect();

    // Keep the newest message in view unless one is highlighted.
    let position = highlighted
        .and_then(|id| messages.iter().position(|m| &m.id == id))
        .or(messages.len().checked_sub(1));
    let mut state = ListState::default().with_selected(position);

    let mut list = List::new(items).block(block);
    if highlighted.is_some() {
        list = list.highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn message_item<'a>(app: &App, message: &'a Message) -> ListItem<'a> {
    let conversation = app.conversation();
    let (sender, sender_style) = if conversation.is_own(message) {
        ("You".to_string(), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    } else {
        let name = conversation
            .selected()
            .map_or_else(|| message.sender.to_string(), |c| c.full_name.clone());
        (name, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    };

    let mut spans = vec![
        Span::styled(
            message.created_at.format("%H:%M").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(sender, sender_style),
        Span::raw(": "),
    ];
    if let Some(text) = message.text() {
        spans.push(Span::raw(text));
    }
    if message.edited {
        spans.push(Span::styled(" (edited)", Style::default().fg(Color::DarkGray)));
    }
    if message.has_images() {
        let count = message.images.len();
        let label = if count == 1 { " [1 image]".to_string() } else { format!(" [{count} images]") };
        spans.push(Span::styled(label, Style::default().fg(Color::Magenta)));
    }
    ListItem::new(Line::from(spans))
}

fn render_viewer(frame: &mut Frame, app: &App, viewer: &ImageViewer, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Image {} of {} ", viewer.index() + 1, viewer.len()))
        .border_style(Style::default().fg(Color::Magenta));

    let url = app.media_base().resolve(viewer.current());
    let lines = vec![
        Line::from(Span::styled(url, Style::default().add_modifier(Modifier::UNDERLINED))),
        Line::default(),
        Line::from(Span::styled("←/→ browse   Esc close", Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}
