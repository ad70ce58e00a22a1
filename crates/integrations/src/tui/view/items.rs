use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use integrations_core::view::ItemCard;

use crate::tui::app::App;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!("Loaded Integration Items ({})", app.cards().len());
    let widget = Paragraph::new(card_lines(app.cards()))
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll(), 0));
    frame.render_widget(widget, area);
}

fn card_lines(cards: &[ItemCard]) -> Vec<Line<'static>> {
    if cards.is_empty() {
        return vec![Line::styled(
            "No data loaded yet.",
            Style::default().fg(Color::DarkGray),
        )];
    }

    let mut lines = Vec::new();
    for (idx, card) in cards.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }
        if let Some(title) = &card.title {
            lines.push(Line::styled(
                title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        for field in &card.fields {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{}: ", field.label),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(field.value.clone()),
            ]));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use integrations_core::view::CardField;

    #[test]
    fn renders_placeholder_when_empty() {
        let lines = card_lines(&[]);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn untitled_card_starts_with_fields() {
        let cards = vec![
            ItemCard {
                title: Some("A".into()),
                fields: vec![],
            },
            ItemCard {
                title: None,
                fields: vec![CardField {
                    label: "Id".into(),
                    value: "2".into(),
                }],
            },
        ];
        let lines = card_lines(&cards);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].spans[1].content, "2");
    }
}
