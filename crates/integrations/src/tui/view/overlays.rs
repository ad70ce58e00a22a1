use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::app::App;
use crate::tui::view::util::centered_rect;

pub fn render(frame: &mut Frame, base_area: Rect, app: &App) {
    if app.show_help() {
        render_help(frame, base_area);
    }
    if let Some(awaiting) = app.awaiting() {
        let lines = vec![
            Line::from(format!("Authorize {} in your browser:", awaiting.kind)),
            Line::from(""),
            Line::from(awaiting.url.to_string()),
            Line::from(""),
            Line::from("Press Enter when done, Esc to cancel"),
        ];
        render_box(frame, base_area, "Authorization", lines, Color::Green);
    }
    if let Some(message) = app.alert() {
        let lines = vec![
            Line::from(message.to_string()),
            Line::from(""),
            Line::from("Press Enter to dismiss"),
        ];
        render_box(frame, base_area, "Error", lines, Color::Red);
    }
}

fn render_help(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from("Navigation:"),
        Line::from("  Tab / Shift+Tab  move between fields"),
        Line::from("  arrows           choose integration type"),
        Line::from("  PgUp / PgDn      scroll loaded items"),
        Line::from("Credentials:"),
        Line::from("  Ctrl+O or Enter on type  authorize via backend"),
        Line::from("  paste JSON + Enter       set credentials manually"),
        Line::from("Data:"),
        Line::from("  Ctrl+L load   Ctrl+K clear"),
        Line::from("Close help with F1 or Esc, quit with Esc or Ctrl+C"),
    ];
    render_box(frame, area, "Help", lines, Color::Yellow);
}

fn render_box(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line>, color: Color) {
    let width = area.width.min(80).max(40);
    let height = (lines.len() as u16 + 2).max(5);
    let overlay_area = centered_rect(width, height, area);
    let widget = Paragraph::new(lines)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true });
    frame.render_widget(Clear, overlay_area);
    frame.render_widget(widget, overlay_area);
}
