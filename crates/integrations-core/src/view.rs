//! Generic key/value rendering of loaded items.
//!
//! Every item becomes an [`ItemCard`]: the `name` field (when truthy) is the
//! title, and every other field whose value is not a placeholder becomes a
//! labelled line. Field order follows the backend response.

use serde_json::Value;

use crate::params::Item;

const TITLE_KEY: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCard {
    pub title: Option<String>,
    pub fields: Vec<CardField>,
}

/// One card per item, in input order.
pub fn render_cards(items: &[Item]) -> Vec<ItemCard> {
    items.iter().map(render_card).collect()
}

pub fn render_card(item: &Item) -> ItemCard {
    let title = item
        .get(TITLE_KEY)
        .filter(|value| is_truthy(value))
        .map(display_value);

    let fields = item
        .iter()
        .filter(|(key, _)| key.as_str() != TITLE_KEY)
        .filter_map(|(key, value)| {
            let value = display_value(value);
            if is_placeholder(&value) {
                None
            } else {
                Some(CardField {
                    label: format_key(key),
                    value,
                })
            }
        })
        .collect();

    ItemCard { title, fields }
}

/// `created_time` → `Created Time`, `id` → `Id`.
pub fn format_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_word = false;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let word = ch.is_ascii_alphanumeric();
        if word && !prev_word {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        prev_word = word;
    }
    out
}

/// String form of a field value; `null` reads as `N/A`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".into(),
        other => stringify(other),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(values) => values.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty()
        || value.eq_ignore_ascii_case("n/a")
        || value.eq_ignore_ascii_case("null")
        || value == "undefined"
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
