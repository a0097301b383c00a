//! Proxy handlers for `/api/ollama/*`.

use super::types::{
    required, ApiError, ChatRequest, CopyRequest, ModelRequest, PromptRequest, ServerRequest,
};
use super::AppState;
use crate::benchmark::{measure_prompt, PromptMeasurement};
use crate::logging::{outcome_label, truncate_preview};
use crate::metrics::record_proxy_request;
use crate::upstream::{
    duration_ms, ChatReply, GenerationOptions, ModelDescriptor, ProbeTimeouts, RunningModel,
    ServerInfo, UpstreamError,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Await a proxy call, recording its outcome under `route`.
async fn observed<T, F>(route: &'static str, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let started = Instant::now();
    let result = call.await;
    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    };
    let elapsed = started.elapsed();
    record_proxy_request(route, status, elapsed);
    tracing::debug!(
        route,
        status = outcome_label(&result),
        elapsed_ms = duration_ms(elapsed),
        "Proxy request handled"
    );
    result
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelActionResponse {
    pub success: bool,
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyResponse {
    pub success: bool,
    pub source: String,
    pub destination: String,
}

/// Successful single stress probe.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressProbeResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub token_count: u64,
    pub tokens_per_second: f64,
    pub response_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub done: bool,
    pub success: bool,
}

/// POST /api/ollama/test-connection
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ServerRequest>,
) -> Result<Json<ServerInfo>, ApiError> {
    observed("test-connection", async {
        let server = state.server(req.server_url.as_deref());
        let timeouts = ProbeTimeouts {
            version: Duration::from_secs(state.config.upstream.connect_timeout_seconds),
            tags: Duration::from_secs(state.config.upstream.tags_timeout_seconds),
        };
        let info = server.test_connection(timeouts).await.map_err(|e| {
            tracing::warn!(server = server.base_url(), error = %e, "Connection test failed");
            ApiError::bad_gateway(&format!("Failed to connect to Ollama server: {}", e))
        })?;
        Ok::<_, ApiError>(Json(info))
    })
    .await
}

/// POST /api/ollama/models
pub async fn models(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ServerRequest>,
) -> Result<Json<Vec<ModelDescriptor>>, ApiError> {
    observed("models", async {
        let models = state
            .server(req.server_url.as_deref())
            .list_models()
            .await?;
        Ok::<_, ApiError>(Json(models))
    })
    .await
}

/// POST /api/ollama/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    observed("chat", async {
        let model = required(&req.model, "model")?;
        let messages = req
            .messages
            .clone()
            .ok_or_else(|| ApiError::missing_parameter("messages"))?;

        if state.config.logging.enable_content_logging {
            if let Some(last) = messages.last() {
                tracing::debug!(model, prompt = %truncate_preview(&last.content), "Chat request");
            }
        }

        let options = GenerationOptions {
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };
        let reply = state
            .server(req.server_url.as_deref())
            .chat(model, messages, options)
            .await?;
        Ok::<_, ApiError>(Json(reply))
    })
    .await
}

/// POST /api/ollama/benchmark - time one prompt at benchmark settings.
pub async fn benchmark(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<PromptMeasurement>, ApiError> {
    observed("benchmark", async {
        let model = required(&req.model, "model")?;
        let prompt = required(&req.prompt, "prompt")?;
        let server = state.server(req.server_url.as_deref());
        let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
        let measured = measure_prompt(server.as_ref(), model, prompt, timeout).await?;
        Ok::<_, ApiError>(Json(measured))
    })
    .await
}

/// POST /api/ollama/stress-test - one timed request.
///
/// A timeout answers 408 with `{error, responseTime, success: false}`,
/// `responseTime` being the configured deadline.
pub async fn stress_probe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PromptRequest>,
) -> Response {
    let started = Instant::now();
    let result = probe(&state, &req).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(ProbeError::Timeout) => StatusCode::REQUEST_TIMEOUT,
        Err(ProbeError::Api(e)) => e.status_code(),
    };
    record_proxy_request("stress-test", status.as_u16(), started.elapsed());

    match result {
        Ok(body) => Json(body).into_response(),
        Err(ProbeError::Timeout) => (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({
                "error": "Request timeout",
                "responseTime": req.timeout,
                "success": false,
            })),
        )
            .into_response(),
        Err(ProbeError::Api(e)) => e.into_response(),
    }
}

enum ProbeError {
    Timeout,
    Api(ApiError),
}

impl From<ApiError> for ProbeError {
    fn from(e: ApiError) -> Self {
        ProbeError::Api(e)
    }
}

async fn probe(state: &AppState, req: &PromptRequest) -> Result<StressProbeResponse, ProbeError> {
    let model = required(&req.model, "model")?;
    let prompt = required(&req.prompt, "prompt")?;
    let server = state.server(req.server_url.as_deref());
    let options = GenerationOptions {
        temperature: req.temperature,
        max_tokens: req.max_tokens,
    };
    let timeout = Duration::from_millis(req.timeout);

    let started = Instant::now();
    let completion = match tokio::time::timeout(
        timeout,
        server.complete_text(model, prompt, options, timeout),
    )
    .await
    {
        Err(_) | Ok(Err(UpstreamError::Timeout(_))) => return Err(ProbeError::Timeout),
        Ok(Err(e)) => return Err(ApiError::from(e).into()),
        Ok(Ok(c)) => c,
    };

    Ok(StressProbeResponse {
        response: completion.response_text,
        model: completion.model_version_tag,
        token_count: completion.token_count,
        tokens_per_second: completion.tokens_per_second,
        response_time: duration_ms(started.elapsed()),
        created_at: completion.created_at,
        done: completion.done,
        success: true,
    })
}

/// POST /api/ollama/load
pub async fn load(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModelRequest>,
) -> Result<Json<ModelActionResponse>, ApiError> {
    observed("load", async {
        let model = required(&req.model, "model")?;
        state
            .server(req.server_url.as_deref())
            .load_model(model)
            .await?;
        tracing::info!(model, "Model loaded");
        Ok::<_, ApiError>(Json(ModelActionResponse {
            success: true,
            model: model.to_string(),
        }))
    })
    .await
}

/// POST /api/ollama/unload
pub async fn unload(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModelRequest>,
) -> Result<Json<ModelActionResponse>, ApiError> {
    observed("unload", async {
        let model = required(&req.model, "model")?;
        state
            .server(req.server_url.as_deref())
            .unload_model(model)
            .await?;
        tracing::info!(model, "Model unloaded");
        Ok::<_, ApiError>(Json(ModelActionResponse {
            success: true,
            model: model.to_string(),
        }))
    })
    .await
}

/// POST /api/ollama/running
pub async fn running(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ServerRequest>,
) -> Result<Json<Vec<RunningModel>>, ApiError> {
    observed("running", async {
        let models = state
            .server(req.server_url.as_deref())
            .running_models()
            .await?;
        Ok::<_, ApiError>(Json(models))
    })
    .await
}

/// POST /api/ollama/copy
pub async fn copy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CopyRequest>,
) -> Result<Json<CopyResponse>, ApiError> {
    observed("copy", async {
        let source = required(&req.source, "source")?;
        let destination = required(&req.destination, "destination")?;
        state
            .server(req.server_url.as_deref())
            .copy_model(source, destination)
            .await?;
        Ok::<_, ApiError>(Json(CopyResponse {
            success: true,
            source: source.to_string(),
            destination: destination.to_string(),
        }))
    })
    .await
}

/// POST /api/ollama/delete
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModelRequest>,
) -> Result<Json<ModelActionResponse>, ApiError> {
    observed("delete", async {
        let model = required(&req.model, "model")?;
        state
            .server(req.server_url.as_deref())
            .delete_model(model)
            .await?;
        tracing::info!(model, "Model deleted");
        Ok::<_, ApiError>(Json(ModelActionResponse {
            success: true,
            model: model.to_string(),
        }))
    })
    .await
}

/// POST /api/ollama/show
pub async fn show(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModelRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    observed("show", async {
        let model = required(&req.model, "model")?;
        let info = state
            .server(req.server_url.as_deref())
            .show_model(model)
            .await?;
        Ok::<_, ApiError>(Json(info))
    })
    .await
}

/// POST /api/ollama/pull - NDJSON progress, one object per line.
///
/// Errors after the stream has started arrive as a final `{"error": ...}`
/// line since the status code is already sent.
pub async fn pull(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModelRequest>,
) -> Result<Response, ApiError> {
    let progress = observed("pull", async {
        let model = required(&req.model, "model")?;
        tracing::info!(model, "Pull started");
        Ok::<_, ApiError>(
            state
                .server(req.server_url.as_deref())
                .pull_model(model)
                .await?,
        )
    })
    .await?;

    let lines = progress.map(|item| {
        let line = match item {
            Ok(p) => serde_json::to_string(&p),
            Err(e) => serde_json::to_string(&json!({ "error": e.to_string() })),
        }
        .unwrap_or_default();
        Ok::<_, Infallible>(format!("{}\n", line))
    });

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}
