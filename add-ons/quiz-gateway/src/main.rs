//! Quiz Gateway: inbound HTTP for the quiz agent.
//! `POST /quiz` runs one session synchronously and answers with its full timeline.

mod handlers;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use quiz_core::{QuizConfig, QuizRunner};
use quiz_voice::{create_best_stt, SttBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BANNER: &str = "Quiz agent is running. POST /quiz with {\"email\", \"secret\", \"url\"}.";

pub(crate) struct AppState {
    pub runner: QuizRunner,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = QuizConfig::from_env();
    if config.uses_default_secret() {
        tracing::warn!("QUIZ_SECRET is not set; the built-in default secret is in effect");
    }

    // The remote backend owns a blocking HTTP client; build it off the async workers.
    let stt: Arc<dyn SttBackend> = match tokio::task::spawn_blocking(create_best_stt).await {
        Ok(stt) => Arc::from(stt),
        Err(e) => {
            tracing::error!(error = %e, "Speech-to-text backend initialisation failed");
            std::process::exit(1);
        }
    };
    tracing::info!(backend = stt.name(), "Speech-to-text backend ready");

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let runner = match QuizRunner::with_http(config, stt) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "HTTP client initialisation failed");
            std::process::exit(1);
        }
    };
    let app = build_app(Arc::new(AppState { runner }));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Cannot bind gateway address");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "Quiz gateway listening");

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %e, "Gateway stopped");
    }
}

fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/quiz", post(handlers::quiz::run_quiz))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_requests))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        target: "quiz::gateway",
        %method,
        %path,
        peer = ?peer,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request"
    );
    response
}

async fn banner() -> &'static str {
    BANNER
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::Html;
    use axum::{extract::State, Json};
    use quiz_core::{FetchedPage, PageSource, QuizError, QuizResult, SubmissionOutcome, SubmissionPayload, Submitter};
    use quiz_voice::PlaceholderStt;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "gateway-test-secret";

    /// Counts fetches; every fetch fails.
    #[derive(Default)]
    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PageSource for CountingSource {
        async fn fetch(&self, url: &str) -> QuizResult<FetchedPage> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Err(QuizError::Fetch(format!("HTTP 503 Service Unavailable for {}", url)))
        }
    }

    struct DoneGrader;

    #[async_trait::async_trait]
    impl Submitter for DoneGrader {
        async fn submit(&self, _: &str, _: &SubmissionPayload) -> SubmissionOutcome {
            SubmissionOutcome {
                status: Some(200),
                body: json!({"correct": true}),
            }
        }
    }

    fn test_config() -> QuizConfig {
        QuizConfig {
            secret: SECRET.to_string(),
            polite_delay: Duration::ZERO,
            ..QuizConfig::default()
        }
    }

    fn fake_app(source: Arc<CountingSource>) -> Router {
        let runner = QuizRunner::new(
            test_config(),
            source,
            Arc::new(DoneGrader),
            Arc::new(PlaceholderStt::new()),
        );
        build_app(Arc::new(AppState { runner }))
    }

    async fn post_quiz(app: Router, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/quiz")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn wrong_secret_is_forbidden_without_fetching() {
        let source = Arc::new(CountingSource::default());
        let (status, json) = post_quiz(
            fake_app(source.clone()),
            r#"{"email": "a@b.c", "secret": "nope", "url": "https://quiz.test/task/1"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["timeline"], json!([]));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let source = Arc::new(CountingSource::default());
        let (status, json) = post_quiz(fake_app(source.clone()), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("not valid JSON"));

        let (status, json) =
            post_quiz(fake_app(source.clone()), r#"{"email": "a@b.c", "secret": "x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("url"));

        for url in ["not a url", "ftp://quiz.test/demo"] {
            let body = format!(
                r#"{{"email": "a@b.c", "secret": "{}", "url": "{}"}}"#,
                SECRET, url
            );
            let (status, json) = post_quiz(fake_app(source.clone()), &body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{url}");
            assert_eq!(json["status"], "validation");
            assert_eq!(json["timeline"], json!([]));
        }
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fatal_fetch_is_internal_error_with_timeline() {
        let source = Arc::new(CountingSource::default());
        let body = format!(
            r#"{{"email": "a@b.c", "secret": "{}", "url": "https://quiz.test/task/1"}}"#,
            SECRET
        );
        let (status, json) = post_quiz(fake_app(source.clone()), &body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["status"], "error");
        assert_eq!(json["timeline"].as_array().unwrap().len(), 1);
        assert_eq!(json["timeline"][0]["iteration"], 1);
        assert!(json["error"].as_str().unwrap().contains("503"));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn banner_and_health() {
        let app = fake_app(Arc::new(CountingSource::default()));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("POST /quiz"));
    }

    // -----------------------------------------------------------------------
    // End to end: real HTTP against a throwaway grading server
    // -----------------------------------------------------------------------

    async fn grade(State(base): State<String>, Json(body): Json<Value>) -> Json<Value> {
        match body["answer"].clone() {
            Value::String(s) if s == "start" => {
                Json(json!({"correct": true, "url": format!("{}/demo-scrape", base)}))
            }
            answer if answer == json!(8123) => Json(json!({"correct": true, "url": null})),
            other => Json(json!({"correct": false, "reason": format!("unexpected {}", other)})),
        }
    }

    async fn spawn_grader() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new()
            .route(
                "/demo-scrape",
                get(|| async { Html(r#"<html><body><p>Code:</p><div id="answer">8123</div></body></html>"#) }),
            )
            .route("/submit", post(grade))
            .with_state(base.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        base
    }

    #[tokio::test]
    async fn full_session_over_http() {
        let base = spawn_grader().await;
        let runner = QuizRunner::with_http(test_config(), Arc::new(PlaceholderStt::new())).unwrap();
        let app = build_app(Arc::new(AppState { runner }));

        let body = format!(
            r#"{{"email": "a@b.c", "secret": "{}", "url": "{}/demo"}}"#,
            SECRET, base
        );
        let (status, json) = post_quiz(app, &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "done");
        let timeline = json["timeline"].as_array().unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0]["answer"], "start");
        assert_eq!(timeline[0]["submit_url"], format!("{}/submit", base));
        assert_eq!(timeline[1]["url"], format!("{}/demo-scrape", base));
        assert_eq!(timeline[1]["answer"], 8123);
        assert_eq!(timeline[1]["status"], 200);
        assert!(timeline[1]["next_url"].is_null());
        assert!(json.get("error").is_none());
    }
}
