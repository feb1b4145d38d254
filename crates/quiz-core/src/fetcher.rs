//! Resource Fetcher: single GET with a bounded timeout, no retries.

use crate::error::{QuizError, QuizResult};
use async_trait::async_trait;
use std::time::Duration;

const USER_AGENT: &str = concat!("quiz-agent/", env!("CARGO_PKG_VERSION"));

/// Raw content of a fetched URL. Binary-safe; text views are lossy UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Build a 200 text page (fixtures, fakes).
    pub fn from_text(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: text.into().into_bytes(),
        }
    }

    /// Build a 200 binary page (fixtures, fakes).
    pub fn from_bytes(url: impl Into<String>, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            content_type: Some(content_type.to_string()),
            body,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// True when the server labelled the body as audio.
    pub fn is_audio(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("audio/"))
            .unwrap_or(false)
    }
}

/// Anything that can retrieve a URL. The HTTP implementation is `HttpFetcher`.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> QuizResult<FetchedPage>;
}

/// reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> QuizResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| QuizError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> QuizResult<FetchedPage> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QuizError::Fetch(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(QuizError::Fetch(format!("HTTP {} for {}", status, url)));
        }
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = res
            .bytes()
            .await
            .map_err(|e| QuizError::Fetch(e.to_string()))?;
        tracing::debug!(target: "quiz::fetch", url, status = status.as_u16(), bytes = body.len(), "Fetched");
        Ok(FetchedPage {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_view_is_lossy() {
        let page = FetchedPage::from_bytes("u", "text/plain", vec![b'o', b'k', 0xFF]);
        assert!(page.text().starts_with("ok"));
        assert!(!page.is_audio());
    }

    #[test]
    fn audio_content_type_is_detected() {
        let page = FetchedPage::from_bytes("u", " Audio/MPEG", vec![]);
        assert!(page.is_audio());
        let page = FetchedPage {
            content_type: None,
            ..FetchedPage::from_text("u", "")
        };
        assert!(!page.is_audio());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/task").await.unwrap_err();
        assert!(matches!(err, QuizError::Fetch(_)));
    }

    #[tokio::test]
    async fn malformed_url_is_a_fetch_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert_eq!(err.kind(), "fetch");
    }
}
