//! Per-model statistics derived from recorded results.
//!
//! Summaries are never stored; they are recomputed from the result list on
//! every call and can be taken at any point during a run.

use super::types::{ModelResults, RequestStatus, StressRequestResult};
use serde::{Deserialize, Serialize};

/// Timing and throughput over completed requests only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedStats {
    pub average_response_time_ms: f64,
    pub min_response_time_ms: u64,
    pub max_response_time_ms: u64,
    pub average_tokens_per_second: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub model_name: String,
    /// Every recorded request, including ones still running
    pub total_requests: usize,
    pub completed_requests: usize,
    pub failed_requests: usize,
    pub running_requests: usize,
    /// `completed / total * 100`; 0 when nothing was recorded
    pub success_rate: f64,
    pub total_tokens: u64,
    /// Absent when no request completed
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub stats: Option<CompletedStats>,
    /// Error text of the latest failed request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub fn summarize(model_name: &str, results: &[StressRequestResult]) -> ModelSummary {
    let completed: Vec<&StressRequestResult> = results
        .iter()
        .filter(|r| r.status == RequestStatus::Completed)
        .collect();
    let failed = results
        .iter()
        .filter(|r| r.status == RequestStatus::Failed)
        .count();
    let running = results.len() - completed.len() - failed;

    let success_rate = if results.is_empty() {
        0.0
    } else {
        completed.len() as f64 / results.len() as f64 * 100.0
    };

    let stats = if completed.is_empty() {
        None
    } else {
        let n = completed.len() as f64;
        let times = completed.iter().map(|r| r.response_time_ms);
        Some(CompletedStats {
            average_response_time_ms: times.clone().sum::<u64>() as f64 / n,
            min_response_time_ms: times.clone().min().unwrap_or_default(),
            max_response_time_ms: times.max().unwrap_or_default(),
            average_tokens_per_second: completed.iter().map(|r| r.tokens_per_second).sum::<f64>()
                / n,
        })
    };

    let last_error = results
        .iter()
        .filter(|r| r.status == RequestStatus::Failed)
        .max_by_key(|r| r.end_time)
        .and_then(|r| r.error.clone());

    ModelSummary {
        model_name: model_name.to_string(),
        total_requests: results.len(),
        completed_requests: completed.len(),
        failed_requests: failed,
        running_requests: running,
        success_rate,
        total_tokens: completed.iter().map(|r| r.token_count).sum(),
        stats,
        last_error,
    }
}

pub fn summarize_all(models: &[ModelResults]) -> Vec<ModelSummary> {
    models
        .iter()
        .map(|m| summarize(&m.model_name, &m.results))
        .collect()
}
