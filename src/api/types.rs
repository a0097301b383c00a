//! Request bodies and the JSON error envelope.

use crate::prompts::PromptStoreError;
use crate::stress::StressError;
use crate::upstream::{ChatMessage, UpstreamError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Body carrying only a target server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRequest {
    #[serde(default)]
    pub server_url: Option<String>,
}

/// Body naming one model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRequest {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_chat_max_tokens", alias = "max_tokens")]
    pub max_tokens: u32,
}

/// Single prompt, as sent by the benchmark and stress-probe routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_probe_max_tokens")]
    pub max_tokens: u32,
    /// Milliseconds
    #[serde(default = "default_probe_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressStartRequest {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
    pub prompt: Option<String>,
    pub iterations: Option<u32>,
    pub concurrent_requests_per_iteration: Option<u32>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_chat_max_tokens() -> u32 {
    2048
}

fn default_probe_max_tokens() -> u32 {
    512
}

fn default_probe_timeout() -> u64 {
    30_000
}

/// Return the trimmed value of a mandatory string field.
pub fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::missing_parameter(field)),
    }
}

/// API error response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    fn new(message: String, r#type: &str, param: Option<String>, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message,
                r#type: r#type.to_string(),
                param,
                code: Some(code.to_string()),
            },
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self::new(
            message.to_string(),
            "invalid_request_error",
            None,
            "invalid_request_error",
        )
    }

    /// 400 naming the absent field.
    pub fn missing_parameter(field: &str) -> Self {
        Self::new(
            format!("Missing required parameter: {}", field),
            "invalid_request_error",
            Some(field.to_string()),
            "invalid_request_error",
        )
    }

    /// Create a not found error (404).
    pub fn not_found(message: &str) -> Self {
        Self::new(message.to_string(), "invalid_request_error", None, "not_found")
    }

    /// Upstream did not answer in time (408).
    pub fn request_timeout(message: &str) -> Self {
        Self::new(message.to_string(), "server_error", None, "request_timeout")
    }

    /// Conflicts with current state (409).
    pub fn conflict(message: &str) -> Self {
        Self::new(message.to_string(), "invalid_request_error", None, "conflict")
    }

    /// Create a bad gateway error (502).
    pub fn bad_gateway(message: &str) -> Self {
        Self::new(message.to_string(), "server_error", None, "bad_gateway")
    }

    pub fn internal(message: &str) -> Self {
        Self::new(message.to_string(), "server_error", None, "internal_error")
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("not_found") => StatusCode::NOT_FOUND,
            Some("request_timeout") => StatusCode::REQUEST_TIMEOUT,
            Some("conflict") => StatusCode::CONFLICT,
            Some("bad_gateway") => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Timeout(_) => ApiError::request_timeout(&e.to_string()),
            UpstreamError::Unsupported(_) => ApiError::bad_request(&e.to_string()),
            _ => ApiError::bad_gateway(&e.to_string()),
        }
    }
}

impl From<StressError> for ApiError {
    fn from(e: StressError) -> Self {
        match e {
            StressError::AlreadyRunning => ApiError::conflict(&e.to_string()),
            _ => ApiError::bad_request(&e.to_string()),
        }
    }
}

impl From<PromptStoreError> for ApiError {
    fn from(e: PromptStoreError) -> Self {
        match &e {
            PromptStoreError::NotFound(_) => ApiError::not_found(&e.to_string()),
            PromptStoreError::Validation { field, .. } => ApiError {
                error: ApiErrorBody {
                    param: Some(field.to_string()),
                    ..ApiError::bad_request(&e.to_string()).error
                },
            },
            PromptStoreError::Io(_) | PromptStoreError::Parse(_) => {
                tracing::error!(error = %e, "Prompt store failure");
                ApiError::internal(&e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("x").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::request_timeout("x").into_response().status(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ApiError::conflict("x").into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::bad_gateway("x").into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_api_error_no_code_returns_500() {
        let error = ApiError {
            error: ApiErrorBody {
                message: "x".to_string(),
                r#type: "server_error".to_string(),
                param: None,
                code: None,
            },
        };
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upstream_error_mapping() {
        assert_eq!(
            ApiError::from(UpstreamError::Timeout(10)).status_code(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ApiError::from(UpstreamError::Network("refused".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(UpstreamError::Upstream {
                status: 404,
                message: "missing".into()
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_stress_error_mapping() {
        assert_eq!(
            ApiError::from(StressError::AlreadyRunning).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StressError::EmptySelection).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_prompt_validation_error_names_field() {
        let err = ApiError::from(PromptStoreError::Validation {
            field: "name",
            message: "cannot be empty".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error.param.as_deref(), Some("name"));
    }

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required(&Some(" llama3 ".into()), "model").unwrap(), "llama3");
        let err = required(&Some("  ".into()), "model").unwrap_err();
        assert_eq!(err.error.param.as_deref(), Some("model"));
        assert!(required(&None, "model").is_err());
    }

    #[test]
    fn test_chat_request_defaults() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"model": "llama3", "messages": [{"role": "user", "content": "hi"}]}"#,
        )
        .unwrap();
        assert_eq!(req.max_tokens, 2048);
        assert_eq!(req.temperature, 0.7);
        assert!(req.server_url.is_none());

        let snake: ChatRequest =
            serde_json::from_str(r#"{"model": "m", "messages": [], "max_tokens": 64}"#).unwrap();
        assert_eq!(snake.max_tokens, 64);
    }

    #[test]
    fn test_prompt_request_defaults() {
        let req: PromptRequest =
            serde_json::from_str(r#"{"serverUrl": "http://x", "model": "m", "prompt": "p"}"#)
                .unwrap();
        assert_eq!(req.timeout, 30_000);
        assert_eq!(req.max_tokens, 512);
        assert_eq!(req.server_url.as_deref(), Some("http://x"));
    }
}
