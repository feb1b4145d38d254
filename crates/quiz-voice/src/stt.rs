//! **Speech-to-Text (STT)**: turn a downloaded audio file into text for an audio task.
//!
//! Implement `SttBackend` for local Whisper (whisper-rs) or a remote OpenAI-compatible API.
//! Backends are blocking; async callers run them on a blocking thread.

use crate::audio::AudioFormat;
use crate::error::{VoiceError, VoiceResult};
use std::path::Path;

/// Backend for converting an audio file on disk to text.
pub trait SttBackend: Send + Sync {
    /// Short name recorded in trace detail.
    fn name(&self) -> &str;

    /// Transcribe the file at `path`. An empty string means nothing was recognised.
    fn transcribe_file(&self, path: &Path) -> VoiceResult<String>;
}

/// Placeholder STT: returns a fixed transcript, or fails when none is configured.
/// Used when no real backend is available and in tests.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    /// If set, return this for every file.
    pub response: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: impl Into<String>) -> Self {
        Self {
            response: Some(s.into()),
        }
    }
}

impl SttBackend for PlaceholderStt {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn transcribe_file(&self, path: &Path) -> VoiceResult<String> {
        match self.response {
            Some(ref r) => Ok(r.clone()),
            None => Err(VoiceError::Config(format!(
                "no STT backend configured (set STT_API_KEY or WHISPER_MODEL_PATH); cannot transcribe {}",
                path.display()
            ))),
        }
    }
}

/// Remote STT backend: OpenAI-compatible transcription API (OpenAI Whisper, OpenRouter, local servers).
/// Uses `STT_API_URL` (e.g. https://api.openai.com/v1), `STT_API_KEY`, and `STT_MODEL` (default whisper-1).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleStt {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model: whisper-1 or gpt-4o-transcribe, etc.
    pub model: String,
    client: reqwest::blocking::Client,
}

impl OpenAiCompatibleStt {
    /// Build from environment: STT_API_URL, STT_API_KEY (or OPENAI_API_KEY), STT_MODEL.
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("STT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("STT_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| VoiceError::Config("STT requires STT_API_KEY or OPENAI_API_KEY".to_string()))?;
        if api_key.trim().is_empty() {
            return Err(VoiceError::Config("STT API key is empty".to_string()));
        }
        let model = std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        Self::new(base_url, api_key, model)
    }

    /// Create with explicit config.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

impl SttBackend for OpenAiCompatibleStt {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    fn transcribe_file(&self, path: &Path) -> VoiceResult<String> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Ok(String::new());
        }
        let format = AudioFormat::from_path(path);
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::blocking::multipart::Part::bytes(bytes)
            .file_name(format!("audio.{}", format.extension()))
            .mime_str(format.mime())
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res.json().map_err(|e| VoiceError::Stt(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(text)
    }
}

// -----------------------------------------------------------------------------
// Local Whisper STT (optional feature). Requires whisper.cpp/ggml.
// -----------------------------------------------------------------------------
#[cfg(feature = "whisper")]
mod whisper_stt {
    use super::*;
    use crate::audio::read_wav_mono;
    use std::sync::Mutex;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Local Whisper STT: loads a ggml model (e.g. ggml-base.en.bin) and runs inference on-device.
    /// Only WAV input at 16 kHz is accepted; other containers need the remote backend.
    pub struct WhisperStt {
        #[allow(dead_code)]
        context: WhisperContext,
        state: Mutex<whisper_rs::WhisperState>,
    }

    impl WhisperStt {
        /// Load the Whisper model from `model_path`.
        pub fn new(model_path: &str) -> VoiceResult<Self> {
            let params = WhisperContextParameters::default();
            let context = WhisperContext::new_with_params(model_path, params)
                .map_err(|e| VoiceError::Stt(format!("Whisper load failed: {}", e)))?;
            let state = context
                .create_state()
                .map_err(|e| VoiceError::Stt(format!("Whisper state init failed: {}", e)))?;
            Ok(Self {
                context,
                state: Mutex::new(state),
            })
        }
    }

    impl SttBackend for WhisperStt {
        fn name(&self) -> &str {
            "whisper"
        }

        fn transcribe_file(&self, path: &Path) -> VoiceResult<String> {
            let (samples, sample_rate) = read_wav_mono(path)?;
            if samples.is_empty() {
                return Ok(String::new());
            }
            if sample_rate != 16000 {
                return Err(VoiceError::Stt(format!(
                    "Whisper expects 16 kHz; got {} Hz (use the remote backend)",
                    sample_rate
                )));
            }
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_no_timestamps(true);
            params.set_language(Some("en"));

            let mut state = self
                .state
                .lock()
                .map_err(|e| VoiceError::Stt(format!("Whisper lock poisoned: {}", e)))?;
            state
                .full(params, &samples)
                .map_err(|e| VoiceError::Stt(format!("Whisper inference failed: {}", e)))?;
            let text = state
                .as_iter()
                .filter_map(|seg| seg.to_str().ok().map(|s| s.to_string()))
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            Ok(text)
        }
    }
}

#[cfg(feature = "whisper")]
pub use whisper_stt::WhisperStt;

/// Create the best available STT backend from environment.
/// Priority: (1) WhisperStt if `WHISPER_MODEL_PATH` is set and the model loads (requires `whisper` feature),
/// (2) OpenAiCompatibleStt if `STT_API_KEY` or `OPENAI_API_KEY` is set, (3) PlaceholderStt (always fails).
pub fn create_best_stt() -> Box<dyn SttBackend> {
    #[cfg(feature = "whisper")]
    {
        if let Ok(path) = std::env::var("WHISPER_MODEL_PATH") {
            let path = path.trim();
            if !path.is_empty() {
                match whisper_stt::WhisperStt::new(path) {
                    Ok(w) => return Box::new(w),
                    Err(e) => tracing::warn!(target: "quiz::voice", error = %e, "Whisper unavailable"),
                }
            }
        }
    }
    match OpenAiCompatibleStt::from_env() {
        Ok(remote) => Box::new(remote),
        Err(e) => {
            tracing::warn!(target: "quiz::voice", error = %e, "No STT backend configured; audio tasks will submit empty answers");
            Box::new(PlaceholderStt::new())
        }
    }
}
