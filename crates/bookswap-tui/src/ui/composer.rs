//! Composer
//!
//! Input line for new messages, edits and slash commands.

use bookswap_app::{App, Focus};
use bookswap_client::MAX_STAGED_IMAGES;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

const PROMPT_WIDTH: u16 = 3; // "> "
const INPUT_LINE_OFFSET_Y: u16 = 1; // inside top border
const RIGHT_PADDING: u16 = 1; // inside right border

/// Render the composer.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let composer = app.conversation().composer();
    let mut title = if composer.is_editing() {
        " Editing (Enter saves, Esc cancels) ".to_string()
    } else {
        " Message ".to_string()
    };
    if !composer.staged().is_empty() {
        title.push_str(&format!("[{}/{MAX_STAGED_IMAGES} images] ", composer.staged().len()));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(super::border_style(app, Focus::Composer));

    let input_text = format!("> {}", app.input_text());
    let paragraph =
        Paragraph::new(input_text).style(Style::default().fg(Color::White)).block(block);
    frame.render_widget(paragraph, area);

    if app.focus() != Focus::Composer || app.viewer().is_some() {
        return;
    }

    let available_width = area.width.saturating_sub(PROMPT_WIDTH + RIGHT_PADDING);
    let cursor_offset = u16::try_from(app.input_cursor()).unwrap_or(u16::MAX).min(available_width);

    let cursor_x = area.x.saturating_add(PROMPT_WIDTH).saturating_add(cursor_offset);
    let cursor_y = area.y.saturating_add(INPUT_LINE_OFFSET_Y);
    let max_x = area.x.saturating_add(area.width).saturating_sub(RIGHT_PADDING);

    frame.set_cursor_position((cursor_x.min(max_x), cursor_y));
}
