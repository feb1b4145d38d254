//! Audio container sniffing and WAV decoding for downloaded task audio.
//!
//! Quiz servers hand out whatever container they like (wav, mp3, ogg, ...). Remote STT
//! needs a sensible file name and mime type; the local Whisper backend needs 16 kHz mono f32 PCM,
//! which we can only produce from WAV without pulling in a full decoder stack.

use crate::error::{VoiceError, VoiceResult};
use std::path::Path;
use std::time::Duration;

/// Container formats we can recognise from magic bytes or a URL extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
    Flac,
    M4a,
    Webm,
    Unknown,
}

impl AudioFormat {
    /// Sniff the container from the first bytes; falls back to the URL's extension.
    pub fn detect(bytes: &[u8], url: Option<&str>) -> Self {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return AudioFormat::Wav;
        }
        if bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0) {
            return AudioFormat::Mp3;
        }
        if bytes.starts_with(b"OggS") {
            return AudioFormat::Ogg;
        }
        if bytes.starts_with(b"fLaC") {
            return AudioFormat::Flac;
        }
        if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
            return AudioFormat::M4a;
        }
        if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return AudioFormat::Webm;
        }
        url.map(Self::from_url).unwrap_or(AudioFormat::Unknown)
    }

    fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        let ext = path.rsplit('.').next().unwrap_or("");
        match ext {
            "wav" => AudioFormat::Wav,
            "mp3" => AudioFormat::Mp3,
            "ogg" | "oga" | "opus" => AudioFormat::Ogg,
            "flac" => AudioFormat::Flac,
            "m4a" | "mp4" | "aac" => AudioFormat::M4a,
            "webm" => AudioFormat::Webm,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
            AudioFormat::M4a => "m4a",
            AudioFormat::Webm => "webm",
            AudioFormat::Unknown => "bin",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Unknown => "application/octet-stream",
        }
    }

    /// Guess from a file path's extension (used by backends that only see the temp file).
    pub fn from_path(path: &Path) -> Self {
        path.to_str().map(Self::from_url).unwrap_or(AudioFormat::Unknown)
    }
}

/// Header facts about a WAV file.
#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub duration: Duration,
}

/// Read the WAV header without decoding samples.
pub fn probe_wav(path: &Path) -> VoiceResult<WavInfo> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(VoiceError::Audio("WAV header reports 0 Hz".to_string()));
    }
    let frames = reader.duration();
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        duration: Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64),
    })
}

/// Decode a WAV file to mono f32 in [-1, 1]. Multi-channel frames are averaged.
/// Returns `(samples, sample_rate)`.
pub fn read_wav_mono(path: &Path) -> VoiceResult<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1) as u32)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for s in frames {
            w.write_sample(*s).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn detects_containers_by_magic() {
        assert_eq!(AudioFormat::detect(b"RIFF\0\0\0\0WAVEfmt ", None), AudioFormat::Wav);
        assert_eq!(AudioFormat::detect(b"ID3\x04rest", None), AudioFormat::Mp3);
        assert_eq!(AudioFormat::detect(b"OggS\0\x02", None), AudioFormat::Ogg);
        assert_eq!(AudioFormat::detect(b"fLaC\0\0", None), AudioFormat::Flac);
        assert_eq!(AudioFormat::detect(b"\0\0\0\x20ftypM4A ", None), AudioFormat::M4a);
    }

    #[test]
    fn falls_back_to_url_extension() {
        let f = AudioFormat::detect(b"garbage", Some("https://host/files/clip.OPUS?x=1"));
        assert_eq!(f, AudioFormat::Ogg);
        assert_eq!(f.extension(), "ogg");
        assert_eq!(AudioFormat::detect(b"garbage", Some("https://host/task")), AudioFormat::Unknown);
        assert_eq!(AudioFormat::Unknown.mime(), "application/octet-stream");
    }

    #[test]
    fn probe_reports_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, 1, 8000, &vec![0i16; 4000]);
        let info = probe_wav(&path).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.duration, Duration::from_millis(500));
    }

    #[test]
    fn stereo_is_averaged_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, 16000, &[16384, 0, -16384, -16384]);
        let (mono, rate) = read_wav_mono(&path).unwrap();
        assert_eq!(rate, 16000);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.25).abs() < 1e-4);
        assert!((mono[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn probe_rejects_non_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(probe_wav(&path).is_err());
    }
}
