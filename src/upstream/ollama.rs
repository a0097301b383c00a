//! Ollama server implementation.

use super::ndjson::ProgressDecoder;
use super::{
    count_words, duration_ms, words_per_second, ChatMessage, ChatReply, Completion,
    GenerationOptions, InferenceServer, ModelDescriptor, ModelDetails, ProbeTimeouts,
    ProgressStream, RunningModel, ServerInfo, UpstreamError,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pulls of large models routinely run for many minutes.
const PULL_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);

/// Ollama HTTP API client.
///
/// - Models via GET /api/tags
/// - Completions via POST /api/generate (non-streaming)
/// - Chat via POST /api/chat
/// - Lifecycle via /api/generate (empty prompt, `keep_alive`), /api/ps,
///   /api/copy, /api/delete, /api/show, /api/pull
#[derive(Clone)]
pub struct OllamaServer {
    base_url: String,
    /// Shared for connection pooling
    client: Arc<Client>,
    /// Deadline for operations that carry none of their own
    default_timeout: Duration,
}

impl OllamaServer {
    pub fn new(base_url: impl Into<String>, client: Arc<Client>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client,
            default_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send with a deadline and turn non-2xx statuses into errors.
    async fn send(&self, req: RequestBuilder, timeout: Duration) -> Result<Response, UpstreamError> {
        let timeout_ms = duration_ms(timeout);
        let response = req
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or_else(|| status.to_string());
            return Err(UpstreamError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        req: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, UpstreamError> {
        let timeout_ms = duration_ms(timeout);
        let response = self.send(req, timeout).await?;
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(timeout_ms)
            } else {
                UpstreamError::InvalidResponse(format!("Failed to read response body: {}", e))
            }
        })?;
        serde_json::from_str(&body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    async fn fetch_tags(&self, timeout: Duration) -> Result<Vec<TagModel>, UpstreamError> {
        let tags: TagsResponse = self
            .send_json(self.client.get(self.url("/api/tags")), timeout)
            .await?;
        Ok(tags.models)
    }
}

/// Ollama reports failures as `{"error": "..."}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    modified_at: Option<String>,
    #[serde(default)]
    digest: String,
    #[serde(default)]
    details: Option<WireDetails>,
}

#[derive(Deserialize, Default)]
struct WireDetails {
    family: Option<String>,
    format: Option<String>,
    parameter_size: Option<String>,
    quantization_level: Option<String>,
}

impl From<WireDetails> for ModelDetails {
    fn from(d: WireDetails) -> Self {
        Self {
            family: d.family,
            format: d.format,
            parameter_size: d.parameter_size,
            quantization_level: d.quantization_level,
        }
    }
}

impl From<TagModel> for ModelDescriptor {
    fn from(m: TagModel) -> Self {
        Self {
            name: m.name,
            size_bytes: m.size,
            modified_at: m
                .modified_at
                .as_deref()
                .and_then(|s| DateTime::<FixedOffset>::parse_from_rfc3339(s).ok()),
            digest: m.digest,
            details: m.details.unwrap_or_default().into(),
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct VersionResponse {
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct PsResponse {
    #[serde(default)]
    models: Vec<PsModel>,
}

#[derive(Deserialize)]
struct PsModel {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    size_vram: u64,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    details: Option<WireDetails>,
}

#[async_trait]
impl InferenceServer for OllamaServer {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, UpstreamError> {
        let models = self.fetch_tags(self.default_timeout).await?;
        Ok(models.into_iter().map(ModelDescriptor::from).collect())
    }

    async fn complete_text(
        &self,
        model: &str,
        prompt: &str,
        options: GenerationOptions,
        timeout: Duration,
    ) -> Result<Completion, UpstreamError> {
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_tokens,
            },
        });

        let start = Instant::now();
        let req = self.client.post(self.url("/api/generate")).json(&body);
        let data: GenerateResponse = self.send_json(req, timeout).await?;
        let elapsed_ms = duration_ms(start.elapsed());

        let response_text = data.response.unwrap_or_default();
        let token_count = count_words(&response_text);

        tracing::debug!(
            model = %model,
            elapsed_ms,
            token_count,
            "Completion finished"
        );

        Ok(Completion {
            token_count,
            tokens_per_second: words_per_second(token_count, elapsed_ms),
            response_text,
            model_version_tag: data.model,
            response_time_ms: elapsed_ms,
            created_at: data.created_at,
            done: data.done,
        })
    }

    async fn test_connection(&self, timeouts: ProbeTimeouts) -> Result<ServerInfo, UpstreamError> {
        let version: VersionResponse = self
            .send_json(self.client.get(self.url("/api/version")), timeouts.version)
            .await?;

        // A reachable server with a broken tag listing still counts as connected.
        let models_count = match self.fetch_tags(timeouts.tags).await {
            Ok(models) => models.len(),
            Err(e) => {
                tracing::warn!(server = %self.base_url, error = %e, "Model count probe failed");
                0
            }
        };

        Ok(ServerInfo {
            success: true,
            version: version.version.unwrap_or_else(|| "unknown".to_string()),
            models_count,
            server_url: self.base_url.clone(),
            timestamp: chrono::Utc::now(),
        })
    }

    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        options: GenerationOptions,
    ) -> Result<ChatReply, UpstreamError> {
        let body = json!({
            "model": model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_tokens,
            },
        });
        let req = self.client.post(self.url("/api/chat")).json(&body);
        let data: ChatResponse = self.send_json(req, self.default_timeout).await?;

        Ok(ChatReply {
            response: data
                .message
                .and_then(|m| m.content)
                .unwrap_or_else(|| "No response generated".to_string()),
            model: data.model,
            created_at: data.created_at,
            done: data.done,
        })
    }

    async fn load_model(&self, model: &str) -> Result<(), UpstreamError> {
        let req = self
            .client
            .post(self.url("/api/generate"))
            .json(&json!({ "model": model, "prompt": "" }));
        self.send(req, self.default_timeout).await?;
        tracing::info!(model = %model, "Model loaded");
        Ok(())
    }

    async fn unload_model(&self, model: &str) -> Result<(), UpstreamError> {
        let req = self
            .client
            .post(self.url("/api/generate"))
            .json(&json!({ "model": model, "prompt": "", "keep_alive": 0 }));
        self.send(req, self.default_timeout).await?;
        tracing::info!(model = %model, "Model unloaded");
        Ok(())
    }

    async fn running_models(&self) -> Result<Vec<RunningModel>, UpstreamError> {
        let ps: PsResponse = self
            .send_json(self.client.get(self.url("/api/ps")), self.default_timeout)
            .await?;
        Ok(ps
            .models
            .into_iter()
            .map(|m| RunningModel {
                name: m.name,
                size_bytes: m.size,
                size_vram_bytes: m.size_vram,
                expires_at: m.expires_at,
                details: m.details.unwrap_or_default().into(),
            })
            .collect())
    }

    async fn copy_model(&self, source: &str, destination: &str) -> Result<(), UpstreamError> {
        let req = self
            .client
            .post(self.url("/api/copy"))
            .json(&json!({ "source": source, "destination": destination }));
        self.send(req, self.default_timeout).await?;
        Ok(())
    }

    async fn delete_model(&self, model: &str) -> Result<(), UpstreamError> {
        let req = self
            .client
            .delete(self.url("/api/delete"))
            .json(&json!({ "model": model }));
        self.send(req, self.default_timeout).await?;
        tracing::info!(model = %model, "Model deleted");
        Ok(())
    }

    async fn show_model(&self, model: &str) -> Result<serde_json::Value, UpstreamError> {
        let req = self
            .client
            .post(self.url("/api/show"))
            .json(&json!({ "model": model, "verbose": true }));
        self.send_json(req, self.default_timeout).await
    }

    async fn pull_model(&self, model: &str) -> Result<ProgressStream, UpstreamError> {
        let req = self
            .client
            .post(self.url("/api/pull"))
            .json(&json!({ "name": model, "stream": true }));
        let response = self.send(req, PULL_TIMEOUT).await?;
        let timeout_ms = duration_ms(PULL_TIMEOUT);

        let stream = async_stream::stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = ProgressDecoder::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for event in decoder.push(&chunk) {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(UpstreamError::from_reqwest(e, timeout_ms));
                        return;
                    }
                }
            }
            if let Some(event) = decoder.finish() {
                yield Ok(event);
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn test_server(base_url: String) -> OllamaServer {
        OllamaServer::new(base_url, Arc::new(Client::new()))
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let server = test_server("http://localhost:11434/".to_string());
        assert_eq!(server.base_url(), "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_list_models_maps_descriptor_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(
                r#"{"models":[{
                    "name":"llama3:8b",
                    "size":4661224676,
                    "modified_at":"2024-05-01T10:00:00.123456789-07:00",
                    "digest":"365c0bd3c000",
                    "details":{"family":"llama","format":"gguf","parameter_size":"8.0B","quantization_level":"Q4_0"}
                },{
                    "name":"tiny:latest",
                    "size":1000,
                    "digest":"abc"
                }]}"#,
            )
            .create_async()
            .await;

        let models = test_server(server.url()).list_models().await.unwrap();

        mock.assert_async().await;
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama3:8b");
        assert_eq!(models[0].size_bytes, 4_661_224_676);
        assert!(models[0].modified_at.is_some());
        assert_eq!(models[0].details.quantization_level.as_deref(), Some("Q4_0"));
        assert_eq!(models[1].details, ModelDetails::default());
    }

    #[tokio::test]
    async fn test_list_models_upstream_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_status(500)
            .with_body(r#"{"error":"boom"}"#)
            .create_async()
            .await;

        let result = test_server(server.url()).list_models().await;
        assert_eq!(
            result,
            Err(UpstreamError::Upstream {
                status: 500,
                message: "boom".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_list_models_network_error() {
        let server = test_server("http://invalid-host-that-does-not-exist:9999".to_string());
        let result = server.list_models().await;
        assert!(matches!(result, Err(UpstreamError::Network(_))));
    }

    #[tokio::test]
    async fn test_list_models_invalid_json() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let result = test_server(server.url()).list_models().await;
        assert!(matches!(result, Err(UpstreamError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_complete_text_sends_options_and_counts_words() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::Json(json!({
                "model": "llama3:8b",
                "prompt": "Say hi",
                "stream": false,
                "options": {"temperature": 0.5, "num_predict": 64}
            })))
            .with_status(200)
            .with_body(r#"{"model":"llama3:8b","response":"Hi there, friend","created_at":"2024-05-01T10:00:00Z","done":true}"#)
            .create_async()
            .await;

        let completion = test_server(server.url())
            .complete_text(
                "llama3:8b",
                "Say hi",
                GenerationOptions {
                    temperature: 0.5,
                    max_tokens: 64,
                },
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(completion.response_text, "Hi there, friend");
        assert_eq!(completion.token_count, 3);
        assert!(completion.tokens_per_second > 0.0);
        assert_eq!(completion.model_version_tag.as_deref(), Some("llama3:8b"));
        assert!(completion.done);
    }

    #[tokio::test]
    async fn test_complete_text_empty_response_has_zero_tokens() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"model":"m","done":true}"#)
            .create_async()
            .await;

        let completion = test_server(server.url())
            .complete_text("m", "p", GenerationOptions::default(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(completion.response_text, "");
        assert_eq!(completion.token_count, 0);
        assert_eq!(completion.tokens_per_second, 0.0);
    }

    #[tokio::test]
    async fn test_complete_text_http_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(404)
            .with_body(r#"{"error":"model 'nope' not found"}"#)
            .create_async()
            .await;

        let result = test_server(server.url())
            .complete_text("nope", "p", GenerationOptions::default(), Duration::from_secs(5))
            .await;

        assert!(matches!(
            result,
            Err(UpstreamError::Upstream { status: 404, ref message }) if message.contains("not found")
        ));
    }

    #[tokio::test]
    async fn test_test_connection_reports_version_and_count() {
        let mut server = Server::new_async().await;
        let _version = server
            .mock("GET", "/api/version")
            .with_status(200)
            .with_body(r#"{"version":"0.3.12"}"#)
            .create_async()
            .await;
        let _tags = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"a"},{"name":"b"}]}"#)
            .create_async()
            .await;

        let info = test_server(server.url())
            .test_connection(ProbeTimeouts::default())
            .await
            .unwrap();

        assert!(info.success);
        assert_eq!(info.version, "0.3.12");
        assert_eq!(info.models_count, 2);
        assert_eq!(info.server_url, server.url());
    }

    #[tokio::test]
    async fn test_test_connection_tags_failure_counts_zero() {
        let mut server = Server::new_async().await;
        let _version = server
            .mock("GET", "/api/version")
            .with_status(200)
            .with_body(r#"{}"#)
            .create_async()
            .await;
        let _tags = server
            .mock("GET", "/api/tags")
            .with_status(500)
            .create_async()
            .await;

        let info = test_server(server.url())
            .test_connection(ProbeTimeouts::default())
            .await
            .unwrap();

        assert_eq!(info.version, "unknown");
        assert_eq!(info.models_count, 0);
    }

    #[tokio::test]
    async fn test_test_connection_version_failure_is_error() {
        let mut server = Server::new_async().await;
        let _version = server
            .mock("GET", "/api/version")
            .with_status(503)
            .create_async()
            .await;

        let result = test_server(server.url())
            .test_connection(ProbeTimeouts::default())
            .await;
        assert!(matches!(result, Err(UpstreamError::Upstream { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_chat_extracts_message_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama3:8b",
                "stream": false,
                "messages": [{"role": "user", "content": "Hello"}],
                "options": {"num_predict": 2048}
            })))
            .with_status(200)
            .with_body(r#"{"model":"llama3:8b","message":{"role":"assistant","content":"Hi!"},"done":true}"#)
            .create_async()
            .await;

        let reply = test_server(server.url())
            .chat(
                "llama3:8b",
                vec![ChatMessage::user("Hello")],
                GenerationOptions {
                    temperature: 0.7,
                    max_tokens: 2048,
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply.response, "Hi!");
        assert!(reply.done);
    }

    #[tokio::test]
    async fn test_chat_missing_message_uses_placeholder() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"model":"m","done":true}"#)
            .create_async()
            .await;

        let reply = test_server(server.url())
            .chat("m", vec![], GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply.response, "No response generated");
    }

    #[tokio::test]
    async fn test_unload_sends_keep_alive_zero() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::Json(json!({"model": "llama3:8b", "prompt": "", "keep_alive": 0})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        test_server(server.url()).unload_model("llama3:8b").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_uses_delete_method() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/delete")
            .match_body(Matcher::Json(json!({"model": "old:latest"})))
            .with_status(200)
            .create_async()
            .await;

        test_server(server.url()).delete_model("old:latest").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_running_models() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/ps")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"llama3:8b","size":5137025024,"size_vram":5137025024,"expires_at":"2024-06-04T14:38:31.83753-07:00","details":{"family":"llama"}}]}"#)
            .create_async()
            .await;

        let running = test_server(server.url()).running_models().await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].size_vram_bytes, 5_137_025_024);
        assert_eq!(running[0].details.family.as_deref(), Some("llama"));
    }

    #[tokio::test]
    async fn test_pull_model_streams_progress() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/pull")
            .match_body(Matcher::Json(json!({"name": "tiny", "stream": true})))
            .with_status(200)
            .with_body(
                "{\"status\":\"pulling manifest\"}\n\
                 {\"status\":\"downloading\",\"digest\":\"sha\",\"total\":100,\"completed\":40}\n\
                 {\"status\":\"success\"}\n",
            )
            .create_async()
            .await;

        let stream = test_server(server.url()).pull_model("tiny").await.unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 3);
        let downloading = events[1].as_ref().unwrap();
        assert_eq!(downloading.fraction(), Some(0.4));
        assert_eq!(events[2].as_ref().unwrap().status, "success");
    }

    #[tokio::test]
    async fn test_pull_model_http_error_before_stream() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/pull")
            .with_status(500)
            .create_async()
            .await;

        let result = test_server(server.url()).pull_model("tiny").await;
        assert!(matches!(result, Err(UpstreamError::Upstream { status: 500, .. })));
    }
}
