//! HTTP handlers for dashboard routes

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use rust_embed::RustEmbed;
use serde::Serialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::stress::{StressStatus, DEFAULT_STRESS_PROMPTS};

const INITIAL_DATA_PLACEHOLDER: &str = "{{INITIAL_DATA}}";

/// Embedded dashboard assets from dashboard/ directory
#[derive(RustEmbed)]
#[folder = "dashboard/"]
struct DashboardAssets;

/// Data rendered into the page so the first paint needs no round trip.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitialData<'a> {
    server_url: String,
    max_models: usize,
    default_prompts: &'a [&'static str],
    stress: StressStatus,
}

/// Serves the main dashboard HTML page with injected initial data
pub async fn dashboard_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(content) = DashboardAssets::get("index.html") else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Dashboard HTML not found").into_response();
    };
    let Ok(html) = std::str::from_utf8(&content.data) else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid HTML encoding").into_response();
    };

    let initial = InitialData {
        server_url: state.config.upstream.resolve(None),
        max_models: state.orchestrator.max_models(),
        default_prompts: &DEFAULT_STRESS_PROMPTS,
        stress: state.orchestrator.status(),
    };
    // `</` would end the script element early.
    let json = serde_json::to_string(&initial)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");

    Html(html.replace(INITIAL_DATA_PLACEHOLDER, &json)).into_response()
}

/// Serves static assets (CSS, JS, etc.)
pub async fn assets_handler(Path(path): Path<String>) -> Response {
    match DashboardAssets::get(&path) {
        Some(content) => {
            let mime_type = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime_type.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
    }
}
