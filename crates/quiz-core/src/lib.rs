//! # Quiz Core - task resolution and submission loop
//!
//! ```text
//! QuizRunner::run(TaskContext)
//!   └─ per iteration
//!        ├─ PageSource::fetch        (fetcher)
//!        ├─ classify                 (classifier)
//!        ├─ extract_*                (extract: encoded, tabular, audio, scrape, generic)
//!        ├─ Submitter::submit        (submit)
//!        └─ continuation_url         (submit)
//! ```
//!
//! The gateway owns transport and secret checking; everything here is reusable from tests with
//! in-memory `PageSource` / `Submitter` fakes.

pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod orchestrator;
pub mod session;
pub mod submit;

pub use classifier::{classify, companion_data_url, CompanionKind, ExtractorChoice, ENTRY_SENTINEL};
pub use config::QuizConfig;
pub use error::{QuizError, QuizResult};
pub use extract::Extraction;
pub use fetcher::{FetchedPage, HttpFetcher, PageSource};
pub use orchestrator::QuizRunner;
pub use session::{IterationState, SessionReport, SessionStatus, TaskContext, TraceEntry};
pub use submit::{
    continuation_url, derive_submit_url, HttpSubmitter, SubmissionOutcome, SubmissionPayload,
    Submitter,
};
