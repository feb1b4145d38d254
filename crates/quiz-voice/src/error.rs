//! Error types for the quiz speech-to-text layer

use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while turning downloaded audio into text
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio format error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for VoiceError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => VoiceError::Io(e),
            other => VoiceError::Audio(other.to_string()),
        }
    }
}
