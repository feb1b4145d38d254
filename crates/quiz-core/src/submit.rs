//! Submission Client: posts the answer and reads the grader's reply.
//!
//! Transport failures never raise. They come back as an outcome with no status so the loop
//! can always write its trace entry before deciding to stop.

use crate::config::QuizConfig;
use crate::error::{QuizError, QuizResult};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Continuation fields, checked in this order before the free scan.
pub const CONTINUATION_KEYS: &[&str] = &["url", "next", "submitUrl", "endpoint"];

static SUBMIT_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^\s'"<>]+/submit[^\s'"<>]*"#).expect("static regex")
});

/// Body posted to the grader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionPayload {
    pub email: String,
    pub secret: String,
    pub url: String,
    pub answer: Value,
}

/// Grader reply. `status == None` marks a transport failure.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub status: Option<u16>,
    pub body: Value,
}

impl SubmissionOutcome {
    pub fn transport_failure(details: impl Into<String>) -> Self {
        Self {
            status: None,
            body: json!({ "error": "submit_failed", "details": details.into() }),
        }
    }

    /// Wrap a raw HTTP reply: JSON when it parses, otherwise the text under `text`.
    pub fn from_response(status: u16, raw: &str) -> Self {
        let body = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| json!({ "text": raw }));
        Self {
            status: Some(status),
            body,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status.is_none()
    }

    /// Error text for the trace when the request never completed.
    pub fn transport_error(&self) -> Option<String> {
        if !self.is_transport_failure() {
            return None;
        }
        self.body
            .get("details")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some("submission transport failure".to_string()))
    }
}

#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, submit_url: &str, payload: &SubmissionPayload) -> SubmissionOutcome;
}

/// reqwest-backed submitter.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new(timeout: Duration) -> QuizResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuizError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, submit_url: &str, payload: &SubmissionPayload) -> SubmissionOutcome {
        let res = match self.client.post(submit_url).json(payload).send().await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(target: "quiz::submit", submit_url, error = %e, "Submission transport failure");
                return SubmissionOutcome::transport_failure(e.to_string());
            }
        };
        let status = res.status().as_u16();
        match res.text().await {
            Ok(raw) => SubmissionOutcome::from_response(status, &raw),
            Err(e) => {
                tracing::warn!(target: "quiz::submit", submit_url, status, error = %e, "Submission body unreadable");
                SubmissionOutcome {
                    status: Some(status),
                    body: json!({ "text": "", "error": e.to_string() }),
                }
            }
        }
    }
}

/// Next task URL from a grader reply, or `None` when the session is finished.
///
/// Well-known fields first, then any string field holding an absolute URL. A well-known field
/// counts only when it is an absolute http(s) URL or a path-like reference (`/`, `./`, `../`,
/// `?`) resolved against `base`. Words such as `"none"` fall through to the scan.
pub fn continuation_url(body: &Value, base: &str) -> Option<String> {
    if let Value::Object(map) = body {
        for key in CONTINUATION_KEYS {
            let Some(raw) = map.get(*key).and_then(Value::as_str).map(str::trim) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            if let Some(resolved) = resolve(base, raw) {
                return Some(resolved);
            }
        }
        return map
            .values()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| is_absolute_url(s))
            .map(str::to_string);
    }
    body.as_str()
        .map(str::trim)
        .filter(|s| is_absolute_url(s))
        .map(str::to_string)
}

fn resolve(base: &str, raw: &str) -> Option<String> {
    if is_absolute_url(raw) {
        return Some(raw.to_string());
    }
    if !is_relative_reference(raw) {
        return None;
    }
    let joined = Url::parse(base).ok()?.join(raw).ok()?;
    Some(joined.to_string())
}

fn is_relative_reference(s: &str) -> bool {
    ["/", "./", "../", "?"].iter().any(|p| s.starts_with(p)) && !s.contains(char::is_whitespace)
}

fn is_absolute_url(s: &str) -> bool {
    (s.starts_with("http://") || s.starts_with("https://"))
        && !s.contains(char::is_whitespace)
        && Url::parse(s).is_ok()
}

/// Submission URL for a session starting at `current_url`.
///
/// A configured endpoint wins. A `/demo` entry path becomes `/submit`; anything else posts to
/// the task host with the configured submission path.
pub fn derive_submit_url(current_url: &str, config: &QuizConfig) -> QuizResult<String> {
    if let Some(ref fixed) = config.submit_url {
        return Ok(fixed.clone());
    }
    let mut parsed = Url::parse(current_url).map_err(|e| {
        QuizError::Validation(format!("cannot derive submission URL from {:?}: {}", current_url, e))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(QuizError::Validation(format!(
            "unsupported task URL scheme: {}",
            parsed.scheme()
        )));
    }
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_query(None);
    parsed.set_fragment(None);
    if path.to_ascii_lowercase().ends_with("/demo") {
        let prefix = &path[..path.len() - "/demo".len()];
        parsed.set_path(&format!("{}/submit", prefix));
    } else {
        parsed.set_path(&config.submit_path);
    }
    Ok(parsed.to_string())
}

/// First absolute URL in the page whose path mentions `/submit`.
pub fn discover_submit_url(page_text: &str) -> Option<String> {
    SUBMIT_LINK_RE
        .find(page_text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ')', ']']).to_string())
}
