//! Session data model: identity, loop state, and the audit trail returned to the caller.

use crate::error::{QuizError, QuizResult};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

/// Identity and entry point for one session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub email: String,
    pub secret: String,
    pub start_url: String,
}

impl TaskContext {
    pub fn new(
        email: impl Into<String>,
        secret: impl Into<String>,
        start_url: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            secret: secret.into(),
            start_url: start_url.into(),
        }
    }

    /// Build from an inbound request body. Every field must be present and a string, and
    /// `url` must be an absolute http(s) URL.
    pub fn from_request(body: &Value) -> QuizResult<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| QuizError::Validation("body must be a JSON object".to_string()))?;
        let mut missing = Vec::new();
        let mut field = |name: &'static str| match obj.get(name).and_then(Value::as_str) {
            Some(s) => s.to_string(),
            None => {
                missing.push(name);
                String::new()
            }
        };
        let email = field("email");
        let secret = field("secret");
        let start_url = field("url");
        if !missing.is_empty() {
            return Err(QuizError::Validation(format!(
                "missing fields: {} (email, secret, url required)",
                missing.join(", ")
            )));
        }
        let scheme = Url::parse(start_url.trim()).map(|u| u.scheme().to_string());
        if !matches!(scheme.as_deref(), Ok("http" | "https")) {
            return Err(QuizError::Validation(format!(
                "url must be an absolute http(s) URL, got {:?}",
                start_url
            )));
        }
        Ok(Self {
            email,
            secret,
            start_url,
        })
    }
}

/// Mutable loop state, owned by the runner for the duration of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationState {
    pub current_url: String,
    pub submit_url: String,
    /// Completed iterations so far (0-based index of the next one).
    pub iteration_index: u32,
    pub done: bool,
}

impl IterationState {
    pub fn new(start_url: impl Into<String>, submit_url: impl Into<String>) -> Self {
        Self {
            current_url: start_url.into(),
            submit_url: submit_url.into(),
            iteration_index: 0,
            done: false,
        }
    }
}

/// One audit record per iteration. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    /// 1-based iteration number.
    pub iteration: u32,
    pub url: String,
    pub submit_url: String,
    pub method: String,
    pub answer: Value,
    pub detail: Value,
    /// HTTP status of the submission; `None` when the request never completed.
    pub status: Option<u16>,
    pub response: Value,
    pub next_url: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Terminal state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Done,
    MaxIterationsReached,
    Error,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Done => "done",
            SessionStatus::MaxIterationsReached => "max_iterations_reached",
            SessionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller gets back: final status plus the full timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub status: SessionStatus,
    pub timeline: Vec<TraceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
