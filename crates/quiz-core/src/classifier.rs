//! Task Classifier: picks an extraction route from the task URL alone.
//!
//! URL shape is checked before anything is fetched. Content only matters for the
//! companion route (audio vs. tabular bytes) and for the heuristic route, where the
//! extractors themselves decide.

use crate::fetcher::FetchedPage;
use quiz_voice::AudioFormat;
use reqwest::Url;

/// Answer submitted for the entry/demo step.
pub const ENTRY_SENTINEL: &str = "start";

const COMPANION_SUFFIX: &str = "-data";
const TABULAR_MARKERS: &[&str] = &["csv", "cutoff", "tabular"];
const ENTRY_SEGMENTS: &[&str] = &["demo", "start"];

/// Which data a companion URL is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionKind {
    Tabular,
    Audio,
}

/// Extraction route, in decision order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorChoice {
    /// Parse the task page's markup.
    Scrape,
    /// Fetch derived data (or reuse the task page when no companion URL exists).
    Companion {
        kind: CompanionKind,
        data_url: Option<String>,
    },
    /// Fixed answer, nothing fetched.
    Sentinel(&'static str),
    /// Encoded payload, then the generic heuristics.
    Heuristic,
}

impl ExtractorChoice {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractorChoice::Scrape => "scrape",
            ExtractorChoice::Companion { kind: CompanionKind::Tabular, .. } => "tabular",
            ExtractorChoice::Companion { kind: CompanionKind::Audio, .. } => "audio",
            ExtractorChoice::Sentinel(_) => "entry",
            ExtractorChoice::Heuristic => "heuristic",
        }
    }

    /// Whether the loop must fetch the task page before extracting.
    pub fn needs_task_page(&self) -> bool {
        !matches!(self, ExtractorChoice::Sentinel(_))
    }
}

/// Classify a task URL. First match wins: scrape, tabular/audio, entry point, heuristic.
pub fn classify(url: &str) -> ExtractorChoice {
    let path = url_path(url).to_ascii_lowercase();

    if path.contains("scrape") {
        return ExtractorChoice::Scrape;
    }

    let audio = path.contains("audio");
    if audio || TABULAR_MARKERS.iter().any(|m| path.contains(m)) {
        let kind = if audio {
            CompanionKind::Audio
        } else {
            CompanionKind::Tabular
        };
        return ExtractorChoice::Companion {
            kind,
            data_url: companion_data_url(url),
        };
    }

    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if ENTRY_SEGMENTS.contains(&last) {
        return ExtractorChoice::Sentinel(ENTRY_SENTINEL);
    }

    ExtractorChoice::Heuristic
}

/// Companion data URL: `-data` appended to the last path segment, query kept.
/// `None` when the path has no segment or already names a data resource.
pub fn companion_data_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let path = parsed.path().to_string();
    let trimmed = path.trim_end_matches('/');
    let trailing = &path[trimmed.len()..];
    let last = trimmed.rsplit('/').next().unwrap_or("");
    if last.is_empty() || last.ends_with(COMPANION_SUFFIX) {
        return None;
    }
    parsed.set_path(&format!("{}{}{}", trimmed, COMPANION_SUFFIX, trailing));
    Some(parsed.to_string())
}

/// Decide what fetched companion bytes actually are. Audio bytes win over the URL's hint,
/// and text never goes to the recogniser.
pub fn companion_content_kind(hint: CompanionKind, page: &FetchedPage) -> CompanionKind {
    if page.is_audio() || AudioFormat::detect(&page.body, None) != AudioFormat::Unknown {
        return CompanionKind::Audio;
    }
    let ct = page.content_type.as_deref().unwrap_or("").to_ascii_lowercase();
    if ct.starts_with("text/") || ct.contains("csv") || ct.contains("json") {
        return CompanionKind::Tabular;
    }
    hint
}

fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}
