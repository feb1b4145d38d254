//! Structural Scrape Extractor: a marker element carrying the answer, else the first
//! purely numeric token of the rendered text.

use super::{numeric_value, Extraction};
use scraper::{Html, Node, Selector};
use serde_json::Value;

pub const METHOD_MARKER: &str = "scrape_marker";
pub const METHOD_NUMERIC: &str = "scrape_first_number";

/// Marker selectors, most specific first.
const MARKER_SELECTORS: &[&str] = &[
    "[data-answer]",
    "#answer",
    ".answer",
    "#secret",
    "#secret-code",
    ".secret",
];

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

pub fn extract_scrape(html: &str, base_url: Option<&str>) -> Option<Extraction> {
    let document = Html::parse_document(html);

    let found = marker_answer(&document)
        .map(|(selector, value)| {
            Extraction::new(value, METHOD_MARKER).with_detail("selector", selector)
        })
        .or_else(|| {
            first_numeric_token(&document).map(|n| Extraction::new(n, METHOD_NUMERIC))
        })?;

    Some(match base_url {
        Some(url) => found.with_detail("source", url),
        None => found,
    })
}

fn marker_answer(document: &Html) -> Option<(&'static str, Value)> {
    for selector_str in MARKER_SELECTORS {
        let Ok(sel) = Selector::parse(selector_str) else {
            continue;
        };
        for el in document.select(&sel) {
            let raw = el
                .value()
                .attr("data-answer")
                .map(str::to_string)
                .unwrap_or_else(|| el.text().collect::<Vec<_>>().join(" "));
            let raw = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            if raw.is_empty() {
                continue;
            }
            return Some((*selector_str, exact_value(raw)));
        }
    }
    None
}

fn first_numeric_token(document: &Html) -> Option<Value> {
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|e| HIDDEN_ELEMENTS.contains(&e.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        for token in text.split_whitespace() {
            let token = token
                .trim_start_matches(|c: char| c != '-' && !c.is_alphanumeric())
                .trim_end_matches(|c: char| !c.is_alphanumeric());
            let digits = token.strip_prefix('-').unwrap_or(token);
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return Some(exact_value(token.to_string()));
            }
        }
    }
    None
}

/// A JSON number only when it prints back as the same text; `007` stays `"007"`.
fn exact_value(raw: String) -> Value {
    match numeric_value(&raw) {
        Some(n) if n.to_string() == raw => n,
        _ => Value::String(raw),
    }
}
