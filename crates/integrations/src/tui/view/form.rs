use integrations_core::IntegrationType;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::app::{App, Focus};
use crate::tui::view::util::focus_style;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let outer = Block::default().title("User Details").borders(Borders::ALL);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(inner);

    let identity = app.identity();
    render_input(frame, rows[0], "User", &identity.user, app.focus() == Focus::User);
    render_input(
        frame,
        rows[1],
        "Organization",
        &identity.org,
        app.focus() == Focus::Org,
    );
    render_selector(frame, rows[2], app);
    render_credentials(frame, rows[3], app);
    if app.load_available() {
        render_actions(frame, rows[4]);
    }
}

fn render_input(frame: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let mut text = value.to_string();
    if focused {
        text.push('_');
    }
    let widget = Paragraph::new(text).block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(focus_style(focused)),
    );
    frame.render_widget(widget, area);
}

fn render_selector(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus() == Focus::Integration;
    let mut spans = Vec::new();
    for kind in IntegrationType::ALL {
        let style = if Some(kind) == app.selected() {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", kind.label()), style));
    }
    let widget = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title("Integration Type")
            .borders(Borders::ALL)
            .border_style(focus_style(focused)),
    );
    frame.render_widget(widget, area);
}

fn render_credentials(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus() == Focus::Credentials;
    let title = match app.selected() {
        Some(kind) => format!("{kind} Credentials"),
        None => "Credentials".to_string(),
    };

    let mut lines = Vec::new();
    if let Some(kind) = app.params().integration_type.filter(|_| app.load_available()) {
        lines.push(Line::styled(
            format!("Connected: {kind}"),
            Style::default().fg(Color::Green),
        ));
    } else if app.selected().is_some() {
        lines.push(Line::from("Ctrl+O connect, or paste JSON + Enter"));
    } else {
        lines.push(Line::from("Select an integration type"));
    }
    let mut input = app.credential_input().to_string();
    if focused {
        input.push('_');
    }
    lines.push(Line::from(input));

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(focused)),
        );
    frame.render_widget(widget, area);
}

fn render_actions(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from("Ctrl+L  Load Data"),
        Line::from("Ctrl+K  Clear Data"),
    ];
    let widget = Paragraph::new(lines)
        .style(Style::default().fg(Color::LightBlue))
        .block(Block::default().title("Data").borders(Borders::ALL));
    frame.render_widget(widget, area);
}
