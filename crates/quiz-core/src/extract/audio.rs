//! Audio-Transcription Extractor.
//!
//! The downloaded bytes go to a named temp file that lives exactly as long as the STT call;
//! it is moved into the blocking task so it is removed even if the caller stops waiting.

use super::Extraction;
use crate::error::{QuizError, QuizResult};
use crate::fetcher::FetchedPage;
use quiz_voice::{probe_wav, AudioFormat, SttBackend};
use std::io::Write;
use std::sync::Arc;

pub const METHOD: &str = "audio_transcription";
pub const ERROR_METHOD: &str = "audio_error";

/// Transcribe downloaded audio. Failures degrade to an empty answer with the error in detail.
pub async fn extract_audio(page: &FetchedPage, stt: Arc<dyn SttBackend>) -> Extraction {
    match transcribe(page, stt).await {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(target: "quiz::extract", url = %page.url, error = %e, "Audio transcription failed");
            Extraction::empty(ERROR_METHOD)
                .with_detail("error", e.to_string())
                .with_detail("bytes", page.body.len())
        }
    }
}

async fn transcribe(page: &FetchedPage, stt: Arc<dyn SttBackend>) -> QuizResult<Extraction> {
    if page.body.is_empty() {
        return Err(QuizError::Transcription("empty audio download".to_string()));
    }
    let format = AudioFormat::detect(&page.body, Some(&page.url));

    let mut file = tempfile::Builder::new()
        .prefix("quiz-audio-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile()?;
    file.write_all(&page.body)?;
    file.flush()?;

    let duration_secs = match format {
        AudioFormat::Wav => probe_wav(file.path()).ok().map(|i| i.duration.as_secs_f64()),
        _ => None,
    };

    let backend = stt.name().to_string();
    let text = tokio::task::spawn_blocking(move || {
        let result = stt.transcribe_file(file.path());
        drop(file);
        result
    })
    .await
    .map_err(|e| QuizError::Transcription(format!("transcription task failed: {}", e)))??;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(QuizError::Transcription("no speech recognised".to_string()));
    }

    let mut extraction = Extraction::new(text, METHOD)
        .with_detail("backend", backend)
        .with_detail("format", format.extension())
        .with_detail("bytes", page.body.len());
    if let Some(secs) = duration_secs {
        extraction = extraction.with_detail("duration_secs", secs);
    }
    Ok(extraction)
}
