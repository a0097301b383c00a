//! Health check endpoint handler.

use crate::api::AppState;
use crate::stress::RunState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub upstream_url: String,
    pub stress_state: RunState,
}

/// GET /health - Liveness of the proxy itself. Does not probe the upstream.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        upstream_url: state.config.upstream.resolve(None),
        stress_state: state.orchestrator.state(),
    })
}
