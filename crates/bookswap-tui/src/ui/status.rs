//! Status bar
//!
//! Displays connection status, the local user and the latest notice.

use bookswap_app::{App, ConnectionState};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

const KEY_HINT: &str = "Tab: switch pane  Esc: quit";

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let connection_status = match app.connection_state() {
        ConnectionState::Disconnected => {
            Span::styled("Disconnected", Style::default().fg(Color::Red))
        },
        ConnectionState::Connecting => {
            Span::styled("Connecting...", Style::default().fg(Color::Yellow))
        },
        ConnectionState::Connected => Span::styled(
            "Connected",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    };

    let user = app.self_id().map_or_else(String::new, |id| format!(" | {id}"));
    let notice = app.status_message().map_or_else(
        || Span::styled(KEY_HINT, Style::default().fg(Color::Gray)),
        |message| Span::styled(message, Style::default().fg(Color::White)),
    );

    let status_line = Line::from(vec![
        Span::raw(" "),
        connection_status,
        Span::raw(user),
        Span::raw(" | "),
        notice,
    ]);

    let paragraph =
        Paragraph::new(status_line).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use bookswap_app::AppEvent;
    use bookswap_proto::{MediaBase, UserId};

    use super::*;
    use crate::ui::test_support::draw;

    fn app() -> App {
        let mut app = App::new("ws://relay.test/chat".into(), MediaBase::new(""));
        let _ = app.handle(AppEvent::Identified { user_id: UserId::new("me").unwrap() });
        app
    }

    #[test]
    fn idle_bar_shows_key_hint() {
        let rows = draw(60, 1, &app(), |frame, app| render(frame, app, frame.area()));
        assert_eq!(rows[0], " Disconnected | me | Tab: switch pane  Esc: quit");
    }

    #[test]
    fn notice_replaces_hint() {
        let mut app = app();
        let _ = app.handle(AppEvent::Connected);
        app.set_status("Attached 1 image(s)");

        let rows = draw(60, 1, &app, |frame, app| render(frame, app, frame.area()));
        assert_eq!(rows[0], " Connected | me | Attached 1 image(s)");
    }
}
