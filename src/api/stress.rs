//! Handlers for `/api/stress/*`.

use super::types::{ApiError, StressStartRequest};
use super::AppState;
use crate::stress::{RunState, StressReport, StressStatus, StressTestConfig};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub stopped: bool,
    pub state: RunState,
}

/// Fill absent fields from the `[stress]` config section.
fn build_config(req: &StressStartRequest, state: &AppState) -> StressTestConfig {
    let defaults = StressTestConfig::from(&state.config.stress);
    StressTestConfig {
        prompt: req
            .prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(defaults.prompt),
        iterations: req.iterations.unwrap_or(defaults.iterations),
        concurrent_requests_per_iteration: req
            .concurrent_requests_per_iteration
            .unwrap_or(defaults.concurrent_requests_per_iteration),
        temperature: req.temperature.unwrap_or(defaults.temperature),
        max_tokens: req.max_tokens.unwrap_or(defaults.max_tokens),
        timeout_ms: req.timeout_ms.unwrap_or(defaults.timeout_ms),
    }
}

/// POST /api/stress/start - 202 with the initial status.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StressStartRequest>,
) -> Result<(StatusCode, Json<StressStatus>), ApiError> {
    let config = build_config(&req, &state);
    let server = state.server(req.server_url.as_deref());

    // Detached; progress is observed through status and events.
    let _handle = state.orchestrator.start(server, &req.models, config)?;
    Ok((StatusCode::ACCEPTED, Json(state.orchestrator.status())))
}

/// POST /api/stress/stop
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<StopResponse> {
    let stopped = state.orchestrator.stop();
    Json(StopResponse {
        stopped,
        state: state.orchestrator.state(),
    })
}

/// GET /api/stress/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StressStatus> {
    Json(state.orchestrator.status())
}

/// GET /api/stress/report - downloadable JSON export.
pub async fn report(State(state): State<Arc<AppState>>) -> Response {
    let report: StressReport = state.orchestrator.report();
    let disposition = format!("attachment; filename=\"{}\"", report.default_file_name());
    ([(header::CONTENT_DISPOSITION, disposition)], Json(report)).into_response()
}
