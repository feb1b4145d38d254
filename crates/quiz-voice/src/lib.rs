//! # Quiz Voice - speech-to-text for audio tasks
//!
//! ```text
//! downloaded bytes ─→ AudioFormat::detect ─→ temp file ─→ SttBackend ─→ text
//!                                                ├─ OpenAiCompatibleStt (remote, any container)
//!                                                ├─ WhisperStt (local, WAV 16 kHz, `whisper` feature)
//!                                                └─ PlaceholderStt (fixed text / always fails)
//! ```

pub mod audio;
pub mod error;
pub mod stt;

pub use audio::{probe_wav, read_wav_mono, AudioFormat, WavInfo};
pub use error::{VoiceError, VoiceResult};
pub use stt::{create_best_stt, OpenAiCompatibleStt, PlaceholderStt, SttBackend};
#[cfg(feature = "whisper")]
pub use stt::WhisperStt;
