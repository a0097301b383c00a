//! Fixed five-prompt benchmark suite.
//!
//! Tests run one after another against a single model. The first failure
//! aborts the suite; results gathered so far travel with the error.

use crate::upstream::{duration_ms, GenerationOptions, InferenceServer, UpstreamError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Shown in place of an empty model answer.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "No response generated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BenchmarkTest {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
    pub category: &'static str,
}

pub const BENCHMARK_TESTS: [BenchmarkTest; 5] = [
    BenchmarkTest {
        id: "1",
        name: "Simple Q&A",
        description: "Basic question answering capability",
        prompt: "What is the capital of France?",
        category: "Knowledge",
    },
    BenchmarkTest {
        id: "2",
        name: "Code Generation",
        description: "Generate a simple Python function",
        prompt: "Write a Python function to calculate the factorial of a number.",
        category: "Programming",
    },
    BenchmarkTest {
        id: "3",
        name: "Creative Writing",
        description: "Generate creative content",
        prompt: "Write a short story about a robot learning to paint.",
        category: "Creative",
    },
    BenchmarkTest {
        id: "4",
        name: "Math Problem",
        description: "Solve a mathematical problem",
        prompt: "If a train travels 120 km in 2 hours, what is its average speed? Show your work.",
        category: "Math",
    },
    BenchmarkTest {
        id: "5",
        name: "Reasoning",
        description: "Logical reasoning test",
        prompt: "All birds can fly. Penguins are birds. Can penguins fly? Explain your reasoning.",
        category: "Logic",
    },
];

/// Sampling used by every benchmark request.
pub const BENCHMARK_OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.7,
    max_tokens: 512,
};

/// One timed prompt, as returned by `POST /api/ollama/benchmark`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptMeasurement {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub token_count: u64,
    /// Whole words per second
    pub tokens_per_second: u64,
    #[serde(rename = "responseTime")]
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub id: String,
    pub model_name: String,
    pub test_name: String,
    pub prompt: String,
    pub response: String,
    pub tokens_per_second: u64,
    #[serde(rename = "responseTime")]
    pub response_time_ms: u64,
    pub token_count: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkSummary {
    pub total_tests: usize,
    pub average_response_time_ms: f64,
    pub average_tokens_per_second: f64,
    pub total_tokens: u64,
}

impl BenchmarkSummary {
    pub fn from_results(results: &[BenchmarkResult]) -> Self {
        if results.is_empty() {
            return Self {
                total_tests: 0,
                average_response_time_ms: 0.0,
                average_tokens_per_second: 0.0,
                total_tokens: 0,
            };
        }
        let n = results.len() as f64;
        Self {
            total_tests: results.len(),
            average_response_time_ms: results.iter().map(|r| r.response_time_ms).sum::<u64>()
                as f64
                / n,
            average_tokens_per_second: results.iter().map(|r| r.tokens_per_second).sum::<u64>()
                as f64
                / n,
            total_tokens: results.iter().map(|r| r.token_count).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub model: String,
    pub results: Vec<BenchmarkResult>,
    pub summary: BenchmarkSummary,
}

/// Reported after each finished test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkProgress {
    pub completed: usize,
    pub total: usize,
    pub test_name: &'static str,
}

impl BenchmarkProgress {
    /// `completed / total`, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        self.completed as f64 / self.total as f64
    }
}

#[derive(Error, Debug)]
#[error("Benchmark test '{test}' failed: {source}")]
pub struct BenchmarkError {
    pub test: &'static str,
    #[source]
    pub source: UpstreamError,
    /// Results of the tests that ran before the failure
    pub completed: Vec<BenchmarkResult>,
}

/// Words per second rounded to the nearest whole number.
fn whole_words_per_second(token_count: u64, elapsed_ms: u64) -> u64 {
    if token_count == 0 {
        return 0;
    }
    let secs = elapsed_ms.max(1) as f64 / 1000.0;
    (token_count as f64 / secs).round() as u64
}

/// Time a single prompt at benchmark settings.
pub async fn measure_prompt(
    server: &dyn InferenceServer,
    model: &str,
    prompt: &str,
    timeout: Duration,
) -> Result<PromptMeasurement, UpstreamError> {
    let started = Instant::now();
    let completion = server
        .complete_text(model, prompt, BENCHMARK_OPTIONS, timeout)
        .await?;
    let elapsed_ms = duration_ms(started.elapsed());

    let response = if completion.response_text.is_empty() {
        EMPTY_RESPONSE_PLACEHOLDER.to_string()
    } else {
        completion.response_text
    };
    Ok(PromptMeasurement {
        response,
        model: completion.model_version_tag,
        token_count: completion.token_count,
        tokens_per_second: whole_words_per_second(completion.token_count, elapsed_ms),
        response_time_ms: elapsed_ms,
        created_at: completion.created_at,
        done: completion.done,
    })
}

/// Run [`BENCHMARK_TESTS`] in order, calling `on_progress` after each test.
pub async fn run_benchmark<F>(
    server: &dyn InferenceServer,
    model: &str,
    timeout: Duration,
    mut on_progress: F,
) -> Result<BenchmarkReport, BenchmarkError>
where
    F: FnMut(BenchmarkProgress, &BenchmarkResult),
{
    let mut results = Vec::with_capacity(BENCHMARK_TESTS.len());
    tracing::info!(model, tests = BENCHMARK_TESTS.len(), "Benchmark started");

    for (i, test) in BENCHMARK_TESTS.iter().enumerate() {
        tracing::debug!(model, test = test.name, "Running benchmark test");
        let measured = match measure_prompt(server, model, test.prompt, timeout).await {
            Ok(m) => m,
            Err(source) => {
                tracing::warn!(model, test = test.name, error = %source, "Benchmark aborted");
                return Err(BenchmarkError {
                    test: test.name,
                    source,
                    completed: results,
                });
            }
        };

        let timestamp = Utc::now();
        let result = BenchmarkResult {
            id: format!("{}{}", timestamp.timestamp_millis(), i),
            model_name: model.to_string(),
            test_name: test.name.to_string(),
            prompt: test.prompt.to_string(),
            response: measured.response,
            tokens_per_second: measured.tokens_per_second,
            response_time_ms: measured.response_time_ms,
            token_count: measured.token_count,
            timestamp,
        };
        on_progress(
            BenchmarkProgress {
                completed: i + 1,
                total: BENCHMARK_TESTS.len(),
                test_name: test.name,
            },
            &result,
        );
        results.push(result);
    }

    let summary = BenchmarkSummary::from_results(&results);
    tracing::info!(
        model,
        average_tokens_per_second = summary.average_tokens_per_second,
        "Benchmark completed"
    );
    Ok(BenchmarkReport {
        model: model.to_string(),
        results,
        summary,
    })
}
