//! HTTP surface.
//!
//! Endpoints:
//!   POST /sql     → execute a statement batch; body `{"sql": "<batch>"}`,
//!                   session keyed by the `Session-ID` header
//!   GET  /health  → liveness probe
//!
//! Successes answer 200 with the JSON array of per-statement outputs,
//! empty result sets included. Errors answer 400 with
//! `{"error": "<message>"}`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::database::{batch_to_json, Engine};

/// `POST /sql` request body.
#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    /// The semicolon-separated statement batch.
    pub sql: String,
}

/// Builds the HTTP router over an engine.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/sql", post(execute_sql))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

async fn execute_sql(
    State(engine): State<Arc<Engine>>,
    headers: HeaderMap,
    Json(request): Json<SqlRequest>,
) -> Response {
    let session_id = headers
        .get("Session-ID")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    tracing::info!(session = %session_id, sql = %request.sql, "batch received");

    match engine.execute(&session_id, &request.sql) {
        Ok(outputs) => Json(batch_to_json(&outputs)).into_response(),
        Err(e) => {
            tracing::warn!(session = %session_id, error = %e, "batch failed");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}
