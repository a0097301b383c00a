//! Inference server abstraction.
//!
//! Everything the dashboard needs from a remote LLM server goes through the
//! [`InferenceServer`] trait. The stress orchestrator and benchmark runner only
//! rely on [`InferenceServer::complete_text`]; the proxy routes use the rest.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::time::Duration;

pub mod error;
pub mod ndjson;
pub mod ollama;
pub mod types;

pub use error::UpstreamError;
pub use ollama::OllamaServer;
pub use types::{
    count_words, duration_ms, words_per_second, ChatMessage, ChatReply, Completion,
    GenerationOptions, ModelDescriptor, ModelDetails, PullProgress, RunningModel, ServerInfo,
};

/// Lazy, finite stream of download progress. Not restartable.
pub type ProgressStream = BoxStream<'static, Result<PullProgress, UpstreamError>>;

/// Deadlines used by a connection probe.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTimeouts {
    pub version: Duration,
    pub tags: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            version: Duration::from_secs(10),
            tags: Duration::from_secs(5),
        }
    }
}

/// A remote LLM server.
///
/// Object-safe; used as `Arc<dyn InferenceServer>`. Dropping any returned
/// future aborts the underlying HTTP request.
#[async_trait]
pub trait InferenceServer: Send + Sync + 'static {
    /// Base URL without trailing slash, e.g. `http://localhost:11434`.
    fn base_url(&self) -> &str;

    /// List installed models.
    ///
    /// - `Err(UpstreamError::Network)` if unreachable
    /// - `Err(UpstreamError::Upstream)` on non-2xx
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, UpstreamError>;

    /// Run a single non-streaming completion bounded by `timeout`.
    ///
    /// Exceeding the deadline yields `Err(UpstreamError::Timeout)`.
    async fn complete_text(
        &self,
        model: &str,
        prompt: &str,
        options: GenerationOptions,
        timeout: Duration,
    ) -> Result<Completion, UpstreamError>;

    // ------------------------------------------------------------------
    // Optional operations
    // ------------------------------------------------------------------

    /// Probe reachability, reporting version and installed model count.
    async fn test_connection(&self, _timeouts: ProbeTimeouts) -> Result<ServerInfo, UpstreamError> {
        Err(UpstreamError::Unsupported("test_connection"))
    }

    async fn chat(
        &self,
        _model: &str,
        _messages: Vec<ChatMessage>,
        _options: GenerationOptions,
    ) -> Result<ChatReply, UpstreamError> {
        Err(UpstreamError::Unsupported("chat"))
    }

    /// Bring a model into memory.
    async fn load_model(&self, _model: &str) -> Result<(), UpstreamError> {
        Err(UpstreamError::Unsupported("load_model"))
    }

    /// Evict a model from memory.
    async fn unload_model(&self, _model: &str) -> Result<(), UpstreamError> {
        Err(UpstreamError::Unsupported("unload_model"))
    }

    async fn running_models(&self) -> Result<Vec<RunningModel>, UpstreamError> {
        Err(UpstreamError::Unsupported("running_models"))
    }

    async fn copy_model(&self, _source: &str, _destination: &str) -> Result<(), UpstreamError> {
        Err(UpstreamError::Unsupported("copy_model"))
    }

    async fn delete_model(&self, _model: &str) -> Result<(), UpstreamError> {
        Err(UpstreamError::Unsupported("delete_model"))
    }

    /// Raw model metadata as reported by the server.
    async fn show_model(&self, _model: &str) -> Result<serde_json::Value, UpstreamError> {
        Err(UpstreamError::Unsupported("show_model"))
    }

    /// Download a model, yielding progress until the transfer finishes.
    async fn pull_model(&self, _model: &str) -> Result<ProgressStream, UpstreamError> {
        Err(UpstreamError::Unsupported("pull_model"))
    }
}
