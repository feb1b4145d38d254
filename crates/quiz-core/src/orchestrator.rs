//! Orchestration Loop: fetch → classify → extract → submit → follow, until the grader stops
//! sending continuation URLs, a fatal transport failure occurs, or the iteration cap is hit.
//!
//! ```text
//!            ┌──────────────── next_url ────────────────┐
//!            ▼                                           │
//! start ─→ fetch ─→ classify ─→ extract ─→ submit ─→ continuation?
//!            │                                │          │
//!            └─ primary fetch error ─→ ERROR ←┘ (transport)   └─ none ─→ DONE
//! ```
//!
//! Every iteration appends exactly one [`TraceEntry`] before the loop decides what to do next.

use crate::classifier::{classify, companion_content_kind, CompanionKind, ExtractorChoice};
use crate::config::QuizConfig;
use crate::error::{QuizError, QuizResult};
use crate::extract::{
    extract_audio, extract_encoded, extract_generic, extract_scrape, extract_tabular, Extraction,
};
use crate::fetcher::{FetchedPage, HttpFetcher, PageSource};
use crate::session::{IterationState, SessionReport, SessionStatus, TaskContext, TraceEntry};
use crate::submit::{
    continuation_url, derive_submit_url, discover_submit_url, HttpSubmitter, SubmissionOutcome,
    SubmissionPayload, Submitter,
};
use chrono::Utc;
use quiz_voice::SttBackend;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

pub const METHOD_ENTRY: &str = "entry_sentinel";
pub const METHOD_FETCH_ERROR: &str = "fetch_error";
pub const METHOD_COMPANION_ERROR: &str = "companion_fetch_error";
pub const METHOD_SCRAPE_NONE: &str = "scrape_none";

/// What the loop does after an iteration has been recorded.
enum Flow {
    Continue(String),
    Done,
    Fatal(String),
}

/// Runs quiz sessions. Holds only read-only collaborators, so one runner serves concurrent
/// sessions; each `run` owns its own state and timeline.
pub struct QuizRunner {
    config: QuizConfig,
    fetcher: Arc<dyn PageSource>,
    submitter: Arc<dyn Submitter>,
    stt: Arc<dyn SttBackend>,
}

impl QuizRunner {
    pub fn new(
        config: QuizConfig,
        fetcher: Arc<dyn PageSource>,
        submitter: Arc<dyn Submitter>,
        stt: Arc<dyn SttBackend>,
    ) -> Self {
        Self {
            config,
            fetcher,
            submitter,
            stt,
        }
    }

    /// Runner wired to real HTTP using the configured timeouts.
    pub fn with_http(config: QuizConfig, stt: Arc<dyn SttBackend>) -> QuizResult<Self> {
        let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout)?);
        let submitter = Arc::new(HttpSubmitter::new(config.submit_timeout)?);
        Ok(Self::new(config, fetcher, submitter, stt))
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// Drive one session to completion.
    pub async fn run(&self, ctx: &TaskContext) -> SessionReport {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("quiz_session", %session_id, start_url = %ctx.start_url);
        self.run_session(ctx).instrument(span).await
    }

    async fn run_session(&self, ctx: &TaskContext) -> SessionReport {
        let submit_url = match derive_submit_url(&ctx.start_url, &self.config) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(target: "quiz::loop", error = %e, "No submission URL for session");
                return SessionReport {
                    status: SessionStatus::Error,
                    timeline: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };
        tracing::info!(target: "quiz::loop", submit_url = %submit_url, max_iterations = self.config.max_iterations, "Session started");

        let mut state = IterationState::new(ctx.start_url.clone(), submit_url);
        let mut timeline = Vec::new();

        while state.iteration_index < self.config.max_iterations {
            if state.iteration_index > 0 && !self.config.polite_delay.is_zero() {
                tokio::time::sleep(self.config.polite_delay).await;
            }
            state.iteration_index += 1;

            let (entry, flow) = self.iterate(ctx, &mut state).await;
            tracing::info!(
                target: "quiz::loop",
                iteration = entry.iteration,
                url = %entry.url,
                method = %entry.method,
                status = ?entry.status,
                next_url = ?entry.next_url,
                "Iteration complete"
            );
            timeline.push(entry);

            match flow {
                Flow::Continue(next) => state.current_url = next,
                Flow::Done => {
                    state.done = true;
                    break;
                }
                Flow::Fatal(error) => {
                    tracing::warn!(target: "quiz::loop", iteration = state.iteration_index, error = %error, "Session aborted");
                    return SessionReport {
                        status: SessionStatus::Error,
                        timeline,
                        error: Some(error),
                    };
                }
            }
        }

        let status = if state.done {
            SessionStatus::Done
        } else {
            SessionStatus::MaxIterationsReached
        };
        tracing::info!(target: "quiz::loop", %status, iterations = state.iteration_index, "Session finished");
        SessionReport {
            status,
            timeline,
            error: None,
        }
    }

    /// One pass. Always yields the trace entry for this iteration.
    async fn iterate(&self, ctx: &TaskContext, state: &mut IterationState) -> (TraceEntry, Flow) {
        let url = state.current_url.clone();
        let choice = classify(&url);
        tracing::debug!(target: "quiz::loop", url = %url, route = choice.label(), "Classified");

        let page = if choice.needs_task_page() {
            match self.fetcher.fetch(&url).await {
                Ok(p) => Some(p),
                Err(e) => {
                    let error = e.to_string();
                    tracing::warn!(target: "quiz::loop", url = %url, error = %error, "Task page fetch failed");
                    let entry = TraceEntry {
                        iteration: state.iteration_index,
                        url,
                        submit_url: state.submit_url.clone(),
                        method: METHOD_FETCH_ERROR.to_string(),
                        answer: Value::String(String::new()),
                        detail: serde_json::json!({ "route": choice.label(), "error_kind": e.kind() }),
                        status: None,
                        response: Value::Null,
                        next_url: None,
                        error: Some(error.clone()),
                        timestamp: Utc::now(),
                    };
                    return (entry, Flow::Fatal(error));
                }
            }
        } else {
            None
        };

        let extraction = self.extract(&choice, page.as_ref()).await;
        self.adopt_submit_url(state, &extraction, page.as_ref());

        let payload = SubmissionPayload {
            email: ctx.email.clone(),
            secret: ctx.secret.clone(),
            url: url.clone(),
            answer: extraction.answer.clone(),
        };
        let outcome = self.submitter.submit(&state.submit_url, &payload).await;

        let transport_error = outcome
            .transport_error()
            .map(|details| QuizError::Submit(details).to_string());
        let next_url = if transport_error.is_some() {
            None
        } else {
            continuation_url(&outcome.body, &state.submit_url)
        };
        let error = transport_error.clone().or_else(|| {
            extraction
                .detail
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        let Extraction {
            answer,
            method,
            mut detail,
        } = extraction;
        detail.insert("route".to_string(), Value::from(choice.label()));
        if let Some(p) = &page {
            detail.insert("page_status".to_string(), Value::from(p.status));
        }
        let SubmissionOutcome { status, body } = outcome;

        let entry = TraceEntry {
            iteration: state.iteration_index,
            url,
            submit_url: state.submit_url.clone(),
            method,
            answer,
            detail: Value::Object(detail),
            status,
            response: body,
            next_url: next_url.clone(),
            error,
            timestamp: Utc::now(),
        };

        let flow = match (transport_error, next_url) {
            (Some(e), _) => Flow::Fatal(e),
            (None, Some(next)) => Flow::Continue(next),
            (None, None) => Flow::Done,
        };
        (entry, flow)
    }

    async fn extract(&self, choice: &ExtractorChoice, page: Option<&FetchedPage>) -> Extraction {
        match (choice, page) {
            (ExtractorChoice::Sentinel(answer), _) => Extraction::new(*answer, METHOD_ENTRY),
            (ExtractorChoice::Scrape, Some(page)) => {
                extract_scrape(&page.text(), Some(&page.url))
                    .unwrap_or_else(|| Extraction::empty(METHOD_SCRAPE_NONE))
            }
            (ExtractorChoice::Companion { kind, data_url }, Some(page)) => {
                self.extract_companion(*kind, data_url.as_deref(), page).await
            }
            (ExtractorChoice::Heuristic, Some(page)) => {
                let text = page.text();
                extract_encoded(&text)
                    .filter(|e| !e.is_empty_answer())
                    .unwrap_or_else(|| extract_generic(&text))
            }
            (_, None) => Extraction::empty(METHOD_FETCH_ERROR),
        }
    }

    /// Tabular/audio: fetch the companion data (or reuse the task page) and dispatch on what
    /// the bytes turn out to be. A failed companion fetch still yields a submittable answer.
    async fn extract_companion(
        &self,
        hint: CompanionKind,
        data_url: Option<&str>,
        page: &FetchedPage,
    ) -> Extraction {
        let fetched;
        let data = match data_url {
            Some(u) => match self.fetcher.fetch(u).await {
                Ok(p) => {
                    fetched = p;
                    &fetched
                }
                Err(e) => {
                    tracing::warn!(target: "quiz::loop", data_url = u, error = %e, "Companion fetch failed");
                    return Extraction::empty(METHOD_COMPANION_ERROR)
                        .with_detail("data_url", u)
                        .with_detail("error", e.to_string());
                }
            },
            None => page,
        };

        let extraction = match companion_content_kind(hint, data) {
            CompanionKind::Audio => extract_audio(data, self.stt.clone()).await,
            CompanionKind::Tabular => extract_tabular(&data.text()),
        };
        extraction
            .with_detail("data_url", data.url.as_str())
            .with_detail("data_status", data.status)
    }

    /// Adopt a submission URL advertised by the task, unless one is pinned by configuration.
    fn adopt_submit_url(
        &self,
        state: &mut IterationState,
        extraction: &Extraction,
        page: Option<&FetchedPage>,
    ) {
        if self.config.submit_url.is_some() {
            return;
        }
        let advertised = extraction
            .advertised_submit_url()
            .map(str::to_string)
            .or_else(|| page.and_then(|p| discover_submit_url(&p.text())));
        if let Some(url) = advertised {
            if url != state.submit_url {
                tracing::info!(target: "quiz::loop", from = %state.submit_url, to = %url, "Submission URL advertised by task");
                state.submit_url = url;
            }
        }
    }
}
