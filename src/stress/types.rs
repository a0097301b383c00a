//! Stress run configuration, per-request records and progress events.

use crate::config::StressDefaults;
use crate::upstream::{Completion, GenerationOptions, UpstreamError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::StressError;

/// Prompts offered when the operator has not written one.
/// Error recorded on requests still in flight when their run is dropped.
pub const ABANDONED_ERROR: &str = "Request abandoned: stress run ended before a response arrived";

pub const DEFAULT_STRESS_PROMPTS: [&str; 5] = [
    "Write a detailed explanation of quantum computing in simple terms.",
    "Create a comprehensive business plan for a sustainable energy startup.",
    "Explain the process of photosynthesis and its importance to life on Earth.",
    "Write a short story about time travel with a surprising twist ending.",
    "Describe the key differences between machine learning and artificial intelligence.",
];

/// Parameters of one run. Fixed once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressTestConfig {
    pub prompt: String,
    pub iterations: u32,
    pub concurrent_requests_per_iteration: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for StressTestConfig {
    fn default() -> Self {
        Self::from(&StressDefaults::default())
    }
}

impl From<&StressDefaults> for StressTestConfig {
    fn from(defaults: &StressDefaults) -> Self {
        Self {
            prompt: DEFAULT_STRESS_PROMPTS[0].to_string(),
            iterations: defaults.iterations,
            concurrent_requests_per_iteration: defaults.concurrent_requests,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            timeout_ms: defaults.timeout_ms,
        }
    }
}

impl StressTestConfig {
    pub fn validate(&self) -> Result<(), StressError> {
        if self.prompt.trim().is_empty() {
            return Err(invalid("prompt", "prompt cannot be empty"));
        }
        if self.iterations == 0 {
            return Err(invalid("iterations", "must be at least 1"));
        }
        if self.concurrent_requests_per_iteration == 0 {
            return Err(invalid("concurrentRequestsPerIteration", "must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeoutMs", "must be greater than 0"));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(invalid("temperature", "must be a non-negative number"));
        }
        Ok(())
    }

    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Requests each model receives over the whole run.
    pub fn requests_per_model(&self) -> u64 {
        self.iterations as u64 * self.concurrent_requests_per_iteration as u64
    }
}

fn invalid(field: &'static str, message: &str) -> StressError {
    StressError::InvalidParameter {
        field,
        message: message.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Running,
    Completed,
    Failed,
}

/// One attempted request.
///
/// Created `Running` at dispatch and moved exactly once to `Completed` or
/// `Failed` by consuming it through [`complete`](Self::complete) or
/// [`fail`](Self::fail).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressRequestResult {
    pub id: Uuid,
    pub model_name: String,
    pub iteration: u32,
    pub slot: u32,
    pub status: RequestStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub response_time_ms: u64,
    pub tokens_per_second: f64,
    pub token_count: u64,
    pub response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StressRequestResult {
    pub fn running(model_name: &str, iteration: u32, slot: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_name: model_name.to_string(),
            iteration,
            slot,
            status: RequestStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            response_time_ms: 0,
            tokens_per_second: 0.0,
            token_count: 0,
            response_text: String::new(),
            error: None,
        }
    }

    /// `elapsed_ms` is wall-clock time measured from dispatch.
    pub fn complete(self, completion: &Completion, elapsed_ms: u64) -> Self {
        Self {
            status: RequestStatus::Completed,
            end_time: Some(Utc::now()),
            response_time_ms: elapsed_ms,
            tokens_per_second: completion.tokens_per_second,
            token_count: completion.token_count,
            response_text: completion.response_text.clone(),
            ..self
        }
    }

    /// Elapsed time up to the failure is recorded, never left at zero-by-default.
    pub fn fail(self, error: &UpstreamError, elapsed_ms: u64) -> Self {
        Self {
            status: RequestStatus::Failed,
            end_time: Some(Utc::now()),
            response_time_ms: elapsed_ms,
            error: Some(error.to_string()),
            ..self
        }
    }

    /// Fail a request whose run went away before it answered.
    ///
    /// Elapsed time is measured from `start_time` to now.
    pub fn abandon(self) -> Self {
        let now = Utc::now();
        let elapsed_ms = u64::try_from((now - self.start_time).num_milliseconds()).unwrap_or(0);
        Self {
            status: RequestStatus::Failed,
            end_time: Some(now),
            response_time_ms: elapsed_ms,
            error: Some(ABANDONED_ERROR.to_string()),
            ..self
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RequestStatus::Running
    }
}

/// All results recorded for one model, in dispatch order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResults {
    pub model_name: String,
    pub results: Vec<StressRequestResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    /// Halted at an iteration boundary after a stop request
    Stopped,
}

/// Progress notifications for observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StressEvent {
    #[serde(rename_all = "camelCase")]
    Started {
        models: Vec<String>,
        total_iterations: u32,
        concurrent_requests_per_iteration: u32,
    },
    RequestStarted {
        result: StressRequestResult,
    },
    RequestFinished {
        result: StressRequestResult,
    },
    #[serde(rename_all = "camelCase")]
    IterationCompleted {
        iteration: u32,
        total_iterations: u32,
        /// `iteration / total_iterations`
        progress: f64,
    },
    Finished {
        state: RunState,
    },
}
