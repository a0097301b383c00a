//! Concurrent multi-model stress testing.
//!
//! A run fires `concurrent_requests_per_iteration` requests at every selected
//! model at once, waits for all of them, then moves to the next iteration.
//! Each request is recorded as `Running` at dispatch and resolved exactly once.
//! A stop request takes effect at the next iteration boundary, so in-flight
//! requests always land before the run ends.

pub mod error;
pub mod report;
pub mod store;
pub mod summary;
pub mod types;

pub use error::StressError;
pub use report::StressReport;
pub use store::ResultStore;
pub use summary::{summarize, summarize_all, CompletedStats, ModelSummary};
pub use types::{
    ModelResults, RequestStatus, RunState, StressEvent, StressRequestResult, StressTestConfig,
    ABANDONED_ERROR, DEFAULT_STRESS_PROMPTS,
};

use crate::logging::truncate_preview;
use crate::upstream::{duration_ms, InferenceServer, UpstreamError};
use futures::future::join_all;
use serde::Serialize;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on models in one run unless configured otherwise.
pub const DEFAULT_MAX_MODELS: usize = 4;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct RunInfo {
    state: RunState,
    current_iteration: u32,
    completed_iterations: u32,
    selected_models: Vec<String>,
    config: Option<StressTestConfig>,
    cancel: CancellationToken,
}

/// Ends the run as `Stopped` if its future is dropped before it finishes.
struct RunGuard<O: Deref<Target = StressOrchestrator>> {
    orchestrator: O,
    armed: bool,
}

impl<O: Deref<Target = StressOrchestrator>> RunGuard<O> {
    fn new(orchestrator: O) -> Self {
        Self {
            orchestrator,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<O: Deref<Target = StressOrchestrator>> Drop for RunGuard<O> {
    fn drop(&mut self) {
        if self.armed {
            self.orchestrator.abandon();
        }
    }
}

/// Point-in-time view of the orchestrator for observers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressStatus {
    pub state: RunState,
    pub current_iteration: u32,
    pub total_iterations: u32,
    /// Fully resolved iterations over `total_iterations`
    pub progress: f64,
    pub selected_models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<StressTestConfig>,
    pub running_requests: usize,
    pub results: Vec<ModelResults>,
    pub summary: Vec<ModelSummary>,
}

/// Drives stress runs and owns their results.
///
/// Only one run is active at a time. Results of the last run stay readable
/// until the next one starts.
pub struct StressOrchestrator {
    store: ResultStore,
    run: RwLock<RunInfo>,
    events: broadcast::Sender<StressEvent>,
    max_models: usize,
    log_content: bool,
}

impl Default for StressOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MODELS)
    }
}

impl StressOrchestrator {
    pub fn new(max_models: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: ResultStore::new(),
            run: RwLock::new(RunInfo::default()),
            events,
            max_models,
            log_content: false,
        }
    }

    /// Include truncated prompt and response text in debug logs.
    pub fn with_content_logging(mut self, enabled: bool) -> Self {
        self.log_content = enabled;
        self
    }

    pub fn max_models(&self) -> usize {
        self.max_models
    }

    /// Receive progress events for every subsequent run.
    ///
    /// Slow receivers may lag and miss events; [`status`](Self::status)
    /// always reflects the full state.
    pub fn subscribe(&self) -> broadcast::Receiver<StressEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> RunState {
        self.run
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Run to completion on the current task.
    ///
    /// Dropping the future ends the run as `Stopped` and fails whatever was
    /// still in flight.
    pub async fn run(
        &self,
        server: Arc<dyn InferenceServer>,
        models: &[String],
        config: StressTestConfig,
    ) -> Result<RunState, StressError> {
        let (models, cancel) = self.begin(models, &config)?;
        let guard = RunGuard::new(self);
        let state = self.execute(server, models, config, cancel).await;
        guard.disarm();
        Ok(state)
    }

    /// Validate and start a run in the background.
    ///
    /// Validation errors are returned immediately; the handle resolves to
    /// the final state.
    pub fn start(
        self: &Arc<Self>,
        server: Arc<dyn InferenceServer>,
        models: &[String],
        config: StressTestConfig,
    ) -> Result<JoinHandle<RunState>, StressError> {
        let (models, cancel) = self.begin(models, &config)?;
        let guard = RunGuard::new(Arc::clone(self));
        Ok(tokio::spawn(async move {
            let state = guard
                .orchestrator
                .execute(server, models, config, cancel)
                .await;
            guard.disarm();
            state
        }))
    }

    /// Ask the active run to halt after its current iteration.
    ///
    /// Returns `false` if nothing is running.
    pub fn stop(&self) -> bool {
        let run = self.run.read().unwrap_or_else(PoisonError::into_inner);
        if run.state != RunState::Running {
            return false;
        }
        tracing::info!(
            iteration = run.current_iteration,
            "Stop requested for stress test"
        );
        run.cancel.cancel();
        true
    }

    pub fn status(&self) -> StressStatus {
        let run = self.run.read().unwrap_or_else(PoisonError::into_inner);
        let results = self.store.snapshot();
        let total_iterations = run.config.as_ref().map_or(0, |c| c.iterations);
        let progress = if total_iterations == 0 {
            0.0
        } else {
            run.completed_iterations as f64 / total_iterations as f64
        };
        StressStatus {
            state: run.state,
            current_iteration: run.current_iteration,
            total_iterations,
            progress,
            selected_models: run.selected_models.clone(),
            config: run.config.clone(),
            running_requests: self.store.running_count(),
            summary: summarize_all(&results),
            results,
        }
    }

    pub fn summaries(&self) -> Vec<ModelSummary> {
        summarize_all(&self.store.snapshot())
    }

    pub fn report(&self) -> StressReport {
        let run = self.run.read().unwrap_or_else(PoisonError::into_inner);
        StressReport::new(
            run.config.clone(),
            run.selected_models.clone(),
            self.store.snapshot(),
        )
    }

    /// Check inputs and move to `Running`.
    fn begin(
        &self,
        models: &[String],
        config: &StressTestConfig,
    ) -> Result<(Vec<String>, CancellationToken), StressError> {
        config.validate()?;

        let mut selected: Vec<String> = Vec::with_capacity(models.len());
        for model in models.iter().map(|m| m.trim()).filter(|m| !m.is_empty()) {
            if !selected.iter().any(|s| s == model) {
                selected.push(model.to_string());
            }
        }
        if selected.is_empty() {
            return Err(StressError::EmptySelection);
        }
        if selected.len() > self.max_models {
            return Err(StressError::TooManyModels {
                selected: selected.len(),
                max: self.max_models,
            });
        }

        let mut run = self.run.write().unwrap_or_else(PoisonError::into_inner);
        if run.state == RunState::Running {
            return Err(StressError::AlreadyRunning);
        }
        let cancel = CancellationToken::new();
        *run = RunInfo {
            state: RunState::Running,
            current_iteration: 0,
            completed_iterations: 0,
            selected_models: selected.clone(),
            config: Some(config.clone()),
            cancel: cancel.clone(),
        };
        self.store.reset(&selected);
        Ok((selected, cancel))
    }

    async fn execute(
        &self,
        server: Arc<dyn InferenceServer>,
        models: Vec<String>,
        config: StressTestConfig,
        cancel: CancellationToken,
    ) -> RunState {
        tracing::info!(
            models = ?models,
            iterations = config.iterations,
            concurrent = config.concurrent_requests_per_iteration,
            timeout_ms = config.timeout_ms,
            server = server.base_url(),
            "Stress test started"
        );
        self.emit(StressEvent::Started {
            models: models.clone(),
            total_iterations: config.iterations,
            concurrent_requests_per_iteration: config.concurrent_requests_per_iteration,
        });

        let mut completed_iterations = 0;
        for iteration in 1..=config.iterations {
            if cancel.is_cancelled() {
                break;
            }
            self.set_iteration(iteration);

            let requests = models.iter().flat_map(|model| {
                (0..config.concurrent_requests_per_iteration)
                    .map(move |slot| (model.as_str(), slot))
            });
            join_all(requests.map(|(model, slot)| {
                self.dispatch(server.as_ref(), model, iteration, slot, &config)
            }))
            .await;

            completed_iterations = iteration;
            self.set_completed(iteration);
            let progress = iteration as f64 / config.iterations as f64;
            tracing::debug!(iteration, progress, "Stress iteration completed");
            self.emit(StressEvent::IterationCompleted {
                iteration,
                total_iterations: config.iterations,
                progress,
            });
        }

        let state = if completed_iterations == config.iterations {
            RunState::Completed
        } else {
            RunState::Stopped
        };
        self.run
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .state = state;

        tracing::info!(
            state = ?state,
            iterations = completed_iterations,
            "Stress test finished"
        );
        self.emit(StressEvent::Finished { state });
        state
    }

    /// One request: record, call, resolve.
    async fn dispatch(
        &self,
        server: &dyn InferenceServer,
        model: &str,
        iteration: u32,
        slot: u32,
        config: &StressTestConfig,
    ) {
        let pending = StressRequestResult::running(model, iteration, slot);
        self.store.register(pending.clone());
        self.emit(StressEvent::RequestStarted {
            result: pending.clone(),
        });

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            config.timeout(),
            server.complete_text(model, &config.prompt, config.options(), config.timeout()),
        )
        .await
        .unwrap_or(Err(UpstreamError::Timeout(config.timeout_ms)));
        let elapsed = started.elapsed();
        let elapsed_ms = duration_ms(elapsed);

        let resolved = match outcome {
            Ok(completion) => {
                if self.log_content {
                    tracing::debug!(
                        model,
                        iteration,
                        slot,
                        response = %truncate_preview(&completion.response_text),
                        "Stress request completed"
                    );
                }
                pending.complete(&completion, elapsed_ms)
            }
            Err(e) => {
                tracing::warn!(model, iteration, slot, error = %e, "Stress request failed");
                pending.fail(&e, elapsed_ms)
            }
        };

        let status = match resolved.status {
            RequestStatus::Completed => "completed",
            _ => "failed",
        };
        metrics::counter!(
            crate::metrics::STRESS_REQUESTS_TOTAL,
            "model" => model.to_string(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            crate::metrics::STRESS_RESPONSE_SECONDS,
            "model" => model.to_string()
        )
        .record(elapsed.as_secs_f64());

        if self.store.resolve(resolved.clone()) {
            self.emit(StressEvent::RequestFinished { result: resolved });
        }
    }

    fn set_iteration(&self, iteration: u32) {
        self.run
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .current_iteration = iteration;
    }

    fn set_completed(&self, iteration: u32) {
        self.run
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .completed_iterations = iteration;
    }

    /// Close out a run whose future was dropped mid-flight.
    fn abandon(&self) {
        let iteration = {
            let mut run = self.run.write().unwrap_or_else(PoisonError::into_inner);
            if run.state != RunState::Running {
                return;
            }
            run.state = RunState::Stopped;
            run.cancel.cancel();
            run.current_iteration
        };
        let abandoned = self.store.abandon_running();
        tracing::warn!(
            iteration,
            abandoned,
            "Stress test dropped before finishing"
        );
        self.emit(StressEvent::Finished {
            state: RunState::Stopped,
        });
    }

    fn emit(&self, event: StressEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
