//! `POST /quiz`: validate, check the shared secret, run one session to completion.
//!
//! | Outcome | Status |
//! |---------|--------|
//! | body not JSON / field missing / url not http(s) | 400 |
//! | secret mismatch | 403 (nothing fetched) |
//! | `done` / `max_iterations_reached` | 200 |
//! | `error` | 500 |

use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quiz_core::{QuizError, SessionStatus, TaskContext};
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn run_quiz(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            let err = QuizError::Validation(format!("body is not valid JSON: {}", e));
            return rejection(StatusCode::BAD_REQUEST, &err);
        }
    };
    let ctx = match TaskContext::from_request(&value) {
        Ok(ctx) => ctx,
        Err(e) => return rejection(StatusCode::BAD_REQUEST, &e),
    };
    if !state.runner.config().secret_matches(&ctx.secret) {
        tracing::warn!(target: "quiz::gateway", email = %ctx.email, "Rejected session: secret mismatch");
        return rejection(StatusCode::FORBIDDEN, &QuizError::Forbidden);
    }

    tracing::info!(target: "quiz::gateway", email = %ctx.email, url = %ctx.start_url, "Session accepted");
    let report = state.runner.run(&ctx).await;
    let code = match report.status {
        SessionStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
        SessionStatus::Done | SessionStatus::MaxIterationsReached => StatusCode::OK,
    };
    (code, Json(report)).into_response()
}

fn rejection(code: StatusCode, err: &QuizError) -> Response {
    let body = json!({
        "status": err.kind(),
        "error": err.to_string(),
        "timeline": [],
    });
    (code, Json(body)).into_response()
}
