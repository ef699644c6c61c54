//! HTTP trigger endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::error;

use super::{Runner, TriggerOutcome, TriggerSource};

/// Build the trigger router.
///
/// - `GET /health`
/// - `POST /api/run` runs the pipeline and answers when it is done
/// - `GET /api/status`
pub fn trigger_routes(runner: Arc<Runner>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/run", post(run_now))
        .route("/api/status", get(status))
        .with_state(runner)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
    }))
}

/// POST /api/run
///
/// 200 with the run summary, 409 if a run is already active, 500 with the
/// failure and run log otherwise.
///
/// The run executes on its own task. A client that disconnects drops only the
/// join handle; the run still archives, logs and records its outcome.
async fn run_now(State(runner): State<Arc<Runner>>) -> impl IntoResponse {
    let task = tokio::spawn(async move { runner.trigger(TriggerSource::Http).await });
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Run task failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": format!("Run task failed: {e}")})),
            );
        }
    };

    match outcome {
        TriggerOutcome::Completed(summary) => {
            (StatusCode::OK, Json(serde_json::to_value(summary).unwrap_or_default()))
        }
        TriggerOutcome::Busy => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "A run is already in progress"})),
        ),
        TriggerOutcome::Failed(failure) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": failure.error.to_string(),
                "stage": failure.error.stage(),
                "run_id": failure.run_id,
                "log": failure.log,
            })),
        ),
    }
}

/// GET /api/status
async fn status(State(runner): State<Arc<Runner>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "running": runner.is_running(),
        "last_run": runner.last_run().await,
    }))
}
