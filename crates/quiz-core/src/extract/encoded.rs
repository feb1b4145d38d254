//! Encoded-Payload Extractor: long base64 runs hiding a JSON task description.

use super::{brace_blocks, parse_object, Extraction};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const METHOD: &str = "encoded_payload";

/// Shorter runs are mostly incidental tokens (hashes, ids, inline images are longer but fail acceptance).
const MIN_CANDIDATE_LEN: usize = 80;
const PREVIEW_CHARS: usize = 200;
const SUBMIT_KEYS: &[&str] = &["submit", "submit_url", "submitUrl"];

static CANDIDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"[A-Za-z0-9+/=]{{{},}}", MIN_CANDIDATE_LEN)).expect("static regex")
});

/// Standard alphabet, padding optional.
const TOLERANT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode one candidate. Invalid UTF-8 in the output is dropped, not replaced.
/// `None` when the run is not valid base64.
pub fn decode_candidate(candidate: &str) -> Option<String> {
    let bytes = TOLERANT.decode(candidate).ok()?;
    let text: String = String::from_utf8_lossy(&bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect();
    Some(text.trim().to_string())
}

/// Acceptance test for a decoded candidate.
pub fn accepts(decoded: &str) -> bool {
    if decoded.is_empty() {
        return false;
    }
    let object_like = decoded.starts_with('{') && decoded.ends_with('}');
    object_like || decoded.contains("answer") || decoded.contains("submit") || decoded.contains("url")
}

/// Scan `text` for encoded runs and read the answer out of the first one that qualifies.
/// Later candidates are never consulted once one passes acceptance.
pub fn extract_encoded(text: &str) -> Option<Extraction> {
    for m in CANDIDATE_RE.find_iter(text) {
        let Some(decoded) = decode_candidate(m.as_str()) else {
            continue;
        };
        if !accepts(&decoded) {
            continue;
        }
        tracing::debug!(target: "quiz::extract", len = m.len(), "Encoded payload accepted");

        let payload = payload_object(&decoded)?;
        let answer = payload.get("answer")?.clone();
        let preview: String = decoded.chars().take(PREVIEW_CHARS).collect();
        let mut extraction = Extraction::new(answer, METHOD)
            .with_detail("candidate_len", m.len())
            .with_detail("decoded_preview", preview);
        if let Some(url) = advertised_submit(&payload) {
            extraction = extraction.with_detail("submit_url", url);
        }
        return Some(extraction);
    }
    None
}

/// The JSON object carried by a decoded payload: the whole text, else the first balanced
/// object with an `answer` field, else the first-`{`-to-last-`}` span.
fn payload_object(decoded: &str) -> Option<Map<String, Value>> {
    if let Some(obj) = parse_object(decoded) {
        return Some(obj);
    }
    let nested = brace_blocks(decoded)
        .into_iter()
        .filter_map(parse_object)
        .find(|obj| obj.contains_key("answer"));
    if nested.is_some() {
        return nested;
    }
    let start = decoded.find('{')?;
    let end = decoded.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&decoded[start..=end])
}

fn advertised_submit(payload: &Map<String, Value>) -> Option<String> {
    SUBMIT_KEYS
        .iter()
        .filter_map(|k| payload.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| s.starts_with("http://") || s.starts_with("https://"))
        .map(str::to_string)
}
