//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees.

mod composer;
mod directory;
mod status;
mod thread;

use bookswap_app::{App, Focus};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
};

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const COMPOSER_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(COMPOSER_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, composer_area, status_area] = chunks.as_ref() else {
        return;
    };

    render_main_area(frame, app, *main_area);
    composer::render(frame, app, *composer_area);
    status::render(frame, app, *status_area);
}

/// Render the main area (directory sidebar + thread).
fn render_main_area(frame: &mut Frame, app: &App, area: Rect) {
    const DIRECTORY_WIDTH: u16 = 28;
    const THREAD_MIN_WIDTH: u16 = 20;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(DIRECTORY_WIDTH), Constraint::Min(THREAD_MIN_WIDTH)])
        .split(area);

    let [directory_area, thread_area] = chunks.as_ref() else {
        return;
    };

    directory::render(frame, app, *directory_area);
    thread::render(frame, app, *thread_area);
}

/// Border style of a pane, highlighted when it has focus.
fn border_style(app: &App, pane: Focus) -> Style {
    if app.focus() == pane { Style::default().fg(Color::Yellow) } else { Style::default() }
}

#[cfg(test)]
pub(crate) mod test_support {
    use bookswap_app::App;
    use ratatui::{Frame, Terminal, backend::TestBackend};

    /// Render into an in-memory terminal and return its rows, right-trimmed.
    pub(crate) fn draw(
        width: u16,
        height: u16,
        app: &App,
        render: impl FnOnce(&mut Frame, &App),
    ) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();

        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                let row: String = (0..width).map(|x| buffer[(x, y)].symbol()).collect();
                row.trim_end().to_string()
            })
            .collect()
    }
}
