use integrations_core::view::ItemCard;
use textwrap::{wrap, Options};

const WIDTH: usize = 80;

pub fn print_cards(cards: &[ItemCard]) {
    for line in card_lines(cards, WIDTH) {
        println!("{}", line);
    }
}

/// Plain-text layout of the cards, wrapped to `width` columns.
pub fn card_lines(cards: &[ItemCard], width: usize) -> Vec<String> {
    if cards.is_empty() {
        return vec!["No data loaded yet.".into()];
    }

    let mut out = Vec::new();
    for (idx, card) in cards.iter().enumerate() {
        if idx > 0 {
            out.push(String::new());
        }
        if let Some(title) = &card.title {
            out.push(title.clone());
            out.push("-".repeat(title.chars().count().clamp(1, width)));
        }
        for field in &card.fields {
            let text = format!("{}: {}", field.label, field.value);
            let options = Options::new(width).subsequent_indent("    ");
            out.extend(wrap(&text, options).into_iter().map(|l| l.into_owned()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use integrations_core::view::CardField;

    #[test]
    fn empty_list_has_placeholder() {
        assert_eq!(card_lines(&[], 80), vec!["No data loaded yet."]);
    }

    #[test]
    fn cards_are_separated_and_titled() {
        let cards = vec![
            ItemCard {
                title: Some("Roadmap".into()),
                fields: vec![CardField {
                    label: "Id".into(),
                    value: "1".into(),
                }],
            },
            ItemCard {
                title: None,
                fields: vec![CardField {
                    label: "Created Time".into(),
                    value: "2024-01-01".into(),
                }],
            },
        ];
        let lines = card_lines(&cards, 80);
        assert_eq!(
            lines,
            vec!["Roadmap", "-------", "Id: 1", "", "Created Time: 2024-01-01"]
        );
    }

    #[test]
    fn long_values_wrap() {
        let cards = vec![ItemCard {
            title: None,
            fields: vec![CardField {
                label: "Description".into(),
                value: "word ".repeat(30),
            }],
        }];
        let lines = card_lines(&cards, 40);
        assert!(lines.len() > 1);
        assert!(lines[1].starts_with("    "));
    }
}
