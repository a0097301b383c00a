//! Shared helpers for llmdeck integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::StreamExt;
use llmdeck::api::{create_router, AppState};
use llmdeck::config::DeckConfig;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

/// Config pointing at `upstream_url` with the prompt library inside `dir`.
pub fn test_config(upstream_url: &str, dir: &TempDir) -> DeckConfig {
    let mut config = DeckConfig::default();
    config.upstream.url = upstream_url.to_string();
    config.prompts.path = dir.path().join("prompts.json");
    config
}

/// Router and state wired to a wiremock Ollama.
///
/// The returned `TempDir` owns the prompt file and must outlive the app.
pub fn make_app(mock_server: &MockServer) -> (axum::Router, Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(&mock_server.uri(), &dir));
    let state = Arc::new(AppState::new(config).unwrap());
    (create_router(Arc::clone(&state)), state, dir)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Read the whole body as a string.
pub async fn body_to_string(response: Response<Body>) -> String {
    let mut body_stream = response.into_body().into_data_stream();
    let mut result = String::new();
    while let Some(chunk) = body_stream.next().await {
        if let Ok(bytes) = chunk {
            result.push_str(&String::from_utf8_lossy(&bytes));
        }
    }
    result
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_to_string(response).await).unwrap()
}

/// `/api/generate` reply carrying `text`.
pub fn generate_body(model: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "response": text,
        "created_at": "2024-05-01T10:00:00Z",
        "done": true
    })
}
