//! # HTTP API
//!
//! JSON endpoints backing the dashboard. Every route that talks to an
//! inference server accepts an optional `serverUrl` and falls back to the
//! configured upstream.
//!
//! ## Endpoints
//!
//! - `POST /api/ollama/*` - Thin proxy over the Ollama API
//! - `POST /api/vram/estimate` - VRAM estimate for a model size
//! - `/api/stress/*` - Start, stop and observe multi-model stress runs
//! - `/api/prompts` - System prompt library
//! - `GET /health`, `GET /metrics`
//! - `GET /`, `GET /assets/*`, `GET /ws` - Embedded dashboard
//!
//! ## Example
//!
//! ```no_run
//! use llmdeck::api::{AppState, create_router};
//! use llmdeck::config::DeckConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(DeckConfig::default());
//! let state = Arc::new(AppState::new(config)?);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Failures share one envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "Prompt 'abc' not found",
//!     "type": "invalid_request_error",
//!     "code": "not_found"
//!   }
//! }
//! ```

mod health;
mod ollama;
mod prompts;
mod stress;
pub mod types;
mod vram;

pub use types::*;

use crate::config::DeckConfig;
use crate::metrics::MetricsCollector;
use crate::prompts::PromptStore;
use crate::stress::StressOrchestrator;
use crate::upstream::{InferenceServer, OllamaServer};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;

/// Maximum request body size (10 MB).
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<DeckConfig>,
    /// Shared by every upstream client for connection pooling
    pub http_client: Arc<reqwest::Client>,
    pub orchestrator: Arc<StressOrchestrator>,
    pub prompts: Mutex<PromptStore>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(config: Arc<DeckConfig>) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()?;

        let start_time = Instant::now();
        let orchestrator = StressOrchestrator::new(config.stress.max_models)
            .with_content_logging(config.logging.enable_content_logging);
        let prompts = PromptStore::open(&config.prompts.path);

        Ok(Self {
            http_client: Arc::new(http_client),
            orchestrator: Arc::new(orchestrator),
            prompts: Mutex::new(prompts),
            start_time,
            metrics_collector: Arc::new(MetricsCollector::install(start_time)),
            config,
        })
    }

    /// Client for `requested`, or for the configured upstream when absent.
    pub fn server(&self, requested: Option<&str>) -> Arc<dyn InferenceServer> {
        let url = self.config.upstream.resolve(requested);
        Arc::new(
            OllamaServer::new(url, Arc::clone(&self.http_client)).with_default_timeout(
                Duration::from_secs(self.config.server.request_timeout_seconds),
            ),
        )
    }

    pub fn prompts(&self) -> MutexGuard<'_, PromptStore> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create the main router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ollama/test-connection", post(ollama::test_connection))
        .route("/api/ollama/models", post(ollama::models))
        .route("/api/ollama/chat", post(ollama::chat))
        .route("/api/ollama/benchmark", post(ollama::benchmark))
        .route("/api/ollama/stress-test", post(ollama::stress_probe))
        .route("/api/ollama/load", post(ollama::load))
        .route("/api/ollama/unload", post(ollama::unload))
        .route("/api/ollama/running", post(ollama::running))
        .route("/api/ollama/copy", post(ollama::copy))
        .route("/api/ollama/delete", post(ollama::delete))
        .route("/api/ollama/show", post(ollama::show))
        .route("/api/ollama/pull", post(ollama::pull))
        .route("/api/vram/estimate", post(vram::estimate))
        .route("/api/stress/start", post(stress::start))
        .route("/api/stress/stop", post(stress::stop))
        .route("/api/stress/status", get(stress::status))
        .route("/api/stress/report", get(stress::report))
        .route("/api/prompts", get(prompts::list).post(prompts::create))
        .route(
            "/api/prompts/:id",
            get(prompts::get_one)
                .put(prompts::update)
                .delete(prompts::delete),
        )
        .route("/api/prompts/:id/favorite", post(prompts::toggle_favorite))
        .route("/api/prompts/:id/duplicate", post(prompts::duplicate))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .route("/", get(crate::dashboard::dashboard_handler))
        .route("/assets/*path", get(crate::dashboard::assets_handler))
        .route("/ws", get(crate::dashboard::websocket_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .with_state(state)
}
