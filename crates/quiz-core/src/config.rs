//! Runtime configuration loaded once at process start.
//!
//! Built from the environment (after `.env` is loaded) and handed to the gateway and the
//! runner as a value. Tests construct it directly with distinct secrets.

use std::time::Duration;

/// Secret used when `QUIZ_SECRET` is unset. The gateway warns at startup when it is in effect.
pub const DEFAULT_SECRET: &str = "change-me";
pub const DEFAULT_MAX_ITERATIONS: u32 = 8;
pub const DEFAULT_SUBMIT_PATH: &str = "/submit";

/// Quiz agent configuration.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | QUIZ_SECRET | change-me | Shared secret compared with the request's `secret`. |
/// | QUIZ_BIND_ADDR | 0.0.0.0 | Gateway bind address. |
/// | PORT | 10000 | Gateway port. |
/// | QUIZ_MAX_ITERATIONS | 8 | Iteration cap per session (inclusive). |
/// | QUIZ_FETCH_TIMEOUT_SECS | 20 | Timeout for task page and companion data fetches. |
/// | QUIZ_SUBMIT_TIMEOUT_SECS | 20 | Timeout for answer submission. |
/// | QUIZ_POLITE_DELAY_MS | 250 | Pause between iterations. |
/// | QUIZ_SUBMIT_URL | unset | Fixed submission endpoint; disables derivation. |
/// | QUIZ_SUBMIT_PATH | /submit | Path joined to the task host when deriving the submission URL. |
#[derive(Debug, Clone, PartialEq)]
pub struct QuizConfig {
    pub secret: String,
    pub bind_addr: String,
    pub port: u16,
    pub max_iterations: u32,
    pub fetch_timeout: Duration,
    pub submit_timeout: Duration,
    pub polite_delay: Duration,
    pub submit_url: Option<String>,
    pub submit_path: String,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            bind_addr: "0.0.0.0".to_string(),
            port: 10000,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            fetch_timeout: Duration::from_secs(20),
            submit_timeout: Duration::from_secs(20),
            polite_delay: Duration::from_millis(250),
            submit_url: None,
            submit_path: DEFAULT_SUBMIT_PATH.to_string(),
        }
    }
}

impl QuizConfig {
    /// Load from process environment. Unset or invalid values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let opt = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let num = |name: &str| opt(name).and_then(|v| v.parse::<u64>().ok());

        let submit_path = opt("QUIZ_SUBMIT_PATH")
            .map(|p| if p.starts_with('/') { p } else { format!("/{}", p) })
            .unwrap_or(d.submit_path);

        Self {
            // Secrets compare exactly; only surrounding newline noise from .env files is dropped.
            secret: lookup("QUIZ_SECRET")
                .map(|v| v.trim_end_matches(['\r', '\n']).to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(d.secret),
            bind_addr: opt("QUIZ_BIND_ADDR").unwrap_or(d.bind_addr),
            port: opt("PORT").and_then(|v| v.parse().ok()).unwrap_or(d.port),
            max_iterations: num("QUIZ_MAX_ITERATIONS")
                .filter(|n| *n >= 1)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(d.max_iterations),
            fetch_timeout: num("QUIZ_FETCH_TIMEOUT_SECS")
                .filter(|n| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(d.fetch_timeout),
            submit_timeout: num("QUIZ_SUBMIT_TIMEOUT_SECS")
                .filter(|n| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(d.submit_timeout),
            polite_delay: num("QUIZ_POLITE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.polite_delay),
            submit_url: opt("QUIZ_SUBMIT_URL"),
            submit_path,
        }
    }

    /// Exact comparison against the configured shared secret.
    pub fn secret_matches(&self, candidate: &str) -> bool {
        candidate == self.secret
    }

    /// True when the built-in secret is still in effect.
    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }
}
