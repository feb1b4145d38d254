//! Integration tests for the remote transcription backend.
//!
//! A throwaway OpenAI-compatible server runs on its own runtime thread; the blocking client is
//! driven from the test thread, the same way the quiz loop drives it from `spawn_blocking`.

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use quiz_voice::{OpenAiCompatibleStt, SttBackend, VoiceError};
use serde_json::{json, Value};
use std::io::Write;

async fn transcriptions(headers: HeaderMap, body: Bytes) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if auth != "Bearer test-key" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    let multipart = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);
    let body = String::from_utf8_lossy(&body);
    if !multipart || !body.contains("whisper-1") || !body.contains("audio.mp3") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad form"})));
    }
    (StatusCode::OK, Json(json!({"text": "  forty two  "})))
}

/// Start the fake API and return its base URL (`http://127.0.0.1:<port>/v1`).
fn spawn_fake_api() -> String {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            let app = Router::new().route("/v1/audio/transcriptions", post(transcriptions));
            let _ = axum::serve(listener, app).await;
        });
    });
    let addr = rx.recv().unwrap();
    format!("http://{}/v1", addr)
}

fn mp3_fixture() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
    file.write_all(b"ID3\x04\x00\x00\x00\x00\x00\x00fake-frames").unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn remote_backend_returns_trimmed_text() {
    let base = spawn_fake_api();
    let stt = OpenAiCompatibleStt::new(base, "test-key", "whisper-1").unwrap();
    let file = mp3_fixture();
    assert_eq!(stt.transcribe_file(file.path()).unwrap(), "forty two");
    assert_eq!(stt.name(), "openai_compatible");
}

#[test]
fn remote_backend_surfaces_api_errors() {
    let base = spawn_fake_api();
    let stt = OpenAiCompatibleStt::new(base, "wrong-key", "whisper-1").unwrap();
    let file = mp3_fixture();
    let err = stt.transcribe_file(file.path()).unwrap_err();
    assert!(matches!(err, VoiceError::Stt(_)));
    assert!(err.to_string().contains("401"));
}

#[test]
#[ignore] // Needs STT_API_KEY and network access
fn live_api_smoke() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let stt = OpenAiCompatibleStt::from_env().expect("STT_API_KEY not set");
    let path = std::env::var("STT_SAMPLE_AUDIO").expect("STT_SAMPLE_AUDIO not set");
    let text = stt.transcribe_file(std::path::Path::new(&path)).unwrap();
    println!("transcript: {}", text);
}
