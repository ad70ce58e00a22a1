use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

use crate::tui::app::App;

mod bottom;
mod form;
mod items;
mod overlays;
pub mod util;

pub fn render_app(frame: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(1)])
        .split(frame.size());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(layout[0]);

    form::render(frame, panes[0], app);
    items::render(frame, panes[1], app);
    bottom::render_status(frame, layout[1], app);

    overlays::render(frame, frame.size(), app);
}
