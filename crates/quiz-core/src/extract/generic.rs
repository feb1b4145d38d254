//! Generic Heuristic Extractor: last resort over raw page text.

use super::{brace_blocks, first_match, numeric_value, parse_object, Extraction, Heuristic};
use once_cell::sync::Lazy;
use regex::Regex;

pub const METHOD_JSON: &str = "generic_json";
pub const METHOD_REVERSE: &str = "generic_reverse";
pub const METHOD_LABEL: &str = "generic_label";
pub const METHOD_NONE: &str = "generic_none";

static REVERSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\breverse\s+(?:the\s+(?:string|word|text)\s+)?["'“‘]([^"'”’]+)["'”’]"#)
        .expect("static regex")
});

static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\banswer\s*[:=]\s*(-?\d+(?:\.\d+)?)").expect("static regex")
});

/// Ordered heuristics; the empty answer is appended by [`extract_generic`].
pub const GENERIC_CHAIN: &[Heuristic] = &[largest_answer_object, reverse_instruction, labeled_number];

/// Always yields: the first heuristic hit, or an explicit empty answer.
pub fn extract_generic(text: &str) -> Extraction {
    first_match(text, GENERIC_CHAIN).unwrap_or_else(|| Extraction::empty(METHOD_NONE))
}

/// Largest well-formed JSON object in the text that carries an `answer` field.
pub fn largest_answer_object(text: &str) -> Option<Extraction> {
    brace_blocks(text)
        .into_iter()
        .filter_map(|block| parse_object(block).map(|obj| (block.len(), obj)))
        .filter(|(_, obj)| obj.contains_key("answer"))
        .max_by_key(|(len, _)| *len)
        .and_then(|(len, obj)| {
            let answer = obj.get("answer")?.clone();
            Some(Extraction::new(answer, METHOD_JSON).with_detail("block_len", len))
        })
}

/// `reverse "hello"` → `"olleh"`.
pub fn reverse_instruction(text: &str) -> Option<Extraction> {
    let caps = REVERSE_RE.captures(text)?;
    let target = caps.get(1)?.as_str();
    let reversed: String = target.chars().rev().collect();
    Some(Extraction::new(reversed, METHOD_REVERSE).with_detail("source_text", target))
}

/// `answer: 42` → 42; `answer = 2.5` → 2.5.
pub fn labeled_number(text: &str) -> Option<Extraction> {
    let caps = LABEL_RE.captures(text)?;
    let value = numeric_value(caps.get(1)?.as_str())?;
    Some(Extraction::new(value, METHOD_LABEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labeled_integer_answer() {
        let e = extract_generic("Some preamble. The answer: 42 is expected.");
        assert_eq!(e.answer, json!(42));
        assert_eq!(e.method, METHOD_LABEL);
    }

    #[test]
    fn labeled_float_answer() {
        let e = labeled_number("ANSWER = -3.25").unwrap();
        assert_eq!(e.answer, json!(-3.25));
    }

    #[test]
    fn oversized_labeled_integer_is_still_an_answer() {
        let e = extract_generic("answer: 123456789012345678901234");
        assert_eq!(e.method, METHOD_LABEL);
        assert!(!e.is_empty_answer());
        assert!(e.answer.is_f64());
    }

    #[test]
    fn reverse_is_case_insensitive() {
        let e = extract_generic(r#"Please REVERSE "hello" and submit it."#);
        assert_eq!(e.answer, json!("olleh"));
        assert_eq!(e.method, METHOD_REVERSE);
        let e = reverse_instruction("reverse the string 'Rust'").unwrap();
        assert_eq!(e.answer, json!("tsuR"));
    }

    #[test]
    fn largest_object_with_answer_wins() {
        let text = r#"small {"answer": 1} big {"email": "a@b.c", "answer": 2, "url": "https://h/x"} none {"x": 3, "padding": "................"}"#;
        let e = extract_generic(text);
        assert_eq!(e.answer, json!(2));
        assert_eq!(e.method, METHOD_JSON);
    }

    #[test]
    fn json_beats_label() {
        let e = extract_generic(r#"answer: 5 {"answer": "json"}"#);
        assert_eq!(e.answer, json!("json"));
    }

    #[test]
    fn nothing_matches_gives_empty_answer() {
        let e = extract_generic("<p>No hints on this page.</p>");
        assert_eq!(e.method, METHOD_NONE);
        assert_eq!(e.answer, json!(""));
        assert!(e.is_empty_answer());
    }

    #[test]
    fn label_needs_a_number() {
        assert!(labeled_number("answer: unknown").is_none());
        assert!(labeled_number("youranswer: 3").is_none());
    }
}
