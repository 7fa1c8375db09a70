use crate::services::metrics::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness check.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "genmedia-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once both storage directories exist.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    for dir in [state.generated.base_path(), state.uploads.base_path()] {
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                tracing::warn!(dir = %dir.display(), "Storage directory unavailable");
                return StatusCode::SERVICE_UNAVAILABLE;
            }
        }
    }
    StatusCode::OK
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        get_metrics(),
    )
}
