//! Error taxonomy for quiz sessions.
//!
//! Only `Fetch` on the primary task page and `Submit` end a session; everything an extractor
//! raises is folded into the trace and the loop keeps submitting.

use thiserror::Error;

/// Result type alias for quiz operations
pub type QuizResult<T> = Result<T, QuizError>;

#[derive(Error, Debug)]
pub enum QuizError {
    /// Malformed or missing request fields.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Secret did not match the configured value.
    #[error("forbidden")]
    Forbidden,

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("submit failed: {0}")]
    Submit(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quiz_voice::VoiceError> for QuizError {
    fn from(err: quiz_voice::VoiceError) -> Self {
        QuizError::Transcription(err.to_string())
    }
}

impl QuizError {
    /// Short machine tag used in trace detail.
    pub fn kind(&self) -> &'static str {
        match self {
            QuizError::Validation(_) => "validation",
            QuizError::Forbidden => "forbidden",
            QuizError::Fetch(_) => "fetch",
            QuizError::Parse(_) => "parse",
            QuizError::Transcription(_) => "transcription",
            QuizError::Submit(_) => "submit",
            QuizError::Config(_) => "config",
            QuizError::Io(_) => "io",
        }
    }
}
