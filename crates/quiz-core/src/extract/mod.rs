//! Answer Extractors.
//!
//! Scrape and encoded return `Option<Extraction>` (`None` means "no answer found"); tabular,
//! audio and generic always yield, degrading to an empty answer. The text heuristics are plain
//! functions evaluated in order by [`first_match`], so each one can be tested against literal
//! fixtures.

pub mod audio;
pub mod encoded;
pub mod generic;
pub mod scrape;
pub mod tabular;

use serde_json::{Map, Value};

pub use audio::extract_audio;
pub use encoded::{decode_candidate, extract_encoded};
pub use generic::{extract_generic, GENERIC_CHAIN};
pub use scrape::extract_scrape;
pub use tabular::{cutoff_sum, extract_tabular};

/// An answer plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub answer: Value,
    pub method: String,
    pub detail: Map<String, Value>,
}

impl Extraction {
    pub fn new(answer: impl Into<Value>, method: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            method: method.into(),
            detail: Map::new(),
        }
    }

    /// Explicit "I don't know": an empty-string answer that is still submitted.
    pub fn empty(method: impl Into<String>) -> Self {
        Self::new("", method)
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }

    pub fn is_empty_answer(&self) -> bool {
        match &self.answer {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Submission URL advertised by the content, if the extractor found one.
    pub fn advertised_submit_url(&self) -> Option<&str> {
        self.detail.get("submit_url").and_then(Value::as_str)
    }
}

/// A text heuristic: pure, independent, `None` when it does not apply.
pub type Heuristic = fn(&str) -> Option<Extraction>;

/// Run heuristics in order; the first one that yields wins.
pub fn first_match(text: &str, chain: &[Heuristic]) -> Option<Extraction> {
    chain.iter().find_map(|h| h(text))
}

/// Number from a token: integer unless a decimal point is present. Integers too wide for
/// `i64` become floats.
pub(crate) fn numeric_value(token: &str) -> Option<Value> {
    let token = token.trim();
    if !token.contains('.') {
        if let Ok(n) = token.parse::<i64>() {
            return Some(Value::from(n));
        }
        let digits = token.strip_prefix('-').unwrap_or(token);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// Every balanced `{...}` span in `text`, ordered by opening position.
///
/// One pass with a stack. Double-quoted strings are honoured only inside braces, so quotes in
/// surrounding prose do not desynchronise the scan.
pub(crate) fn brace_blocks(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut stack: Vec<usize> = Vec::new();
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if !stack.is_empty() => in_string = true,
            b'{' => stack.push(i),
            b'}' => {
                if let Some(open) = stack.pop() {
                    pairs.push((open, i));
                }
            }
            _ => {}
        }
    }

    pairs.sort_unstable_by_key(|(open, _)| *open);
    pairs.into_iter().map(|(o, c)| &text[o..=c]).collect()
}

/// Parse `s` as a JSON object.
pub(crate) fn parse_object(s: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
