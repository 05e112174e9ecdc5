//! Directory sidebar
//!
//! Conversations with presence dots, initials and a preview of the latest
//! message.

use bookswap_app::{App, Focus};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

const ONLINE_DOT: &str = "●";
const OFFLINE_DOT: &str = "○";
const CURSOR_PREFIX: &str = ">";
const NO_CURSOR_PREFIX: &str = " ";

/// Render the directory sidebar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.search_query().is_empty() {
        " Conversations ".to_string()
    } else {
        format!(" Search: {} ", app.search_query())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(super::border_style(app, Focus::Directory));

    let conversation = app.conversation();
    let selected = conversation.selected().map(|c| &c.user_id);
    let entries = app.filtered_directory();

    if entries.is_empty() {
        let hint = if app.search_query().is_empty() { "No conversations yet" } else { "No match" };
        let list = List::new([ListItem::new(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        ))])
        .block(block);
        frame.render_widget(list, area);
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(row, entry)| {
            let prefix =
                if row == app.directory_cursor() { CURSOR_PREFIX } else { NO_CURSOR_PREFIX };
            let (dot, dot_style) = if conversation.is_online(&entry.user_id) {
                (ONLINE_DOT, Style::default().fg(Color::Green))
            } else {
                (OFFLINE_DOT, Style::default().fg(Color::DarkGray))
            };
            let name_style = if selected == Some(&entry.user_id) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(prefix),
                    Span::styled(dot, dot_style),
                    Span::styled(
                        format!(" [{}] ", entry.initial()),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled(entry.full_name.clone(), name_style),
                ]),
                Line::from(Span::styled(
                    format!("    {}", entry.last_message),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let mut state = ListState::default().with_selected(Some(app.directory_cursor()));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

#[cfg(test)]
mod tests {
    use bookswap_app::AppEvent;
    use bookswap_proto::{Counterpart, Inbound, MediaBase, UserId};

    use super::*;
    use crate::ui::test_support::draw;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn app_with_directory() -> App {
        let mut app = App::new("ws://relay.test/chat".into(), MediaBase::new(""));
        let _ = app.handle(AppEvent::Identified { user_id: user("me") });
        let mut alice = Counterpart::new(user("alice"), "Alice", "");
        alice.last_message = "see you at 5".into();
        let _ = app.handle(AppEvent::Relay(Inbound::DirectorySnapshot(vec![
            alice,
            Counterpart::new(user("bob"), "Bob", ""),
        ])));
        let _ = app.handle(AppEvent::Relay(Inbound::PresenceSnapshot(vec![user("alice")])));
        app
    }

    #[test]
    fn entries_show_presence_and_preview() {
        let app = app_with_directory();
        let rows = draw(28, 7, &app, |frame, app| render(frame, app, frame.area()));
        insta::assert_snapshot!(rows.join("\n"), @r"
        ┌ Conversations ───────────┐
        │>● [A] Alice              │
        │    see you at 5          │
        │ ○ [B] Bob                │
        │                          │
        │                          │
        └──────────────────────────┘
        ");
    }

    #[test]
    fn empty_search_result_says_so() {
        let mut app = app_with_directory();
        for c in "zed".chars() {
            let _ = app.handle(AppEvent::Key(bookswap_app::KeyInput::Char(c)));
        }
        let rows = draw(28, 4, &app, |frame, app| render(frame, app, frame.area()));
        assert!(rows[0].contains("Search: zed"));
        assert!(rows[1].contains("No match"));
    }
}
