//! Stress command implementation

use crate::cli::output::{format_stress_summary, to_json};
use crate::cli::{upstream_server, StressArgs};
use crate::config::DeckConfig;
use crate::stress::{
    RequestStatus, RunState, StressError, StressEvent, StressOrchestrator, StressReport,
    StressTestConfig,
};
use crate::upstream::InferenceServer;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Config defaults with any flags applied on top.
pub fn build_config(args: &StressArgs, config: &DeckConfig) -> StressTestConfig {
    let mut test = StressTestConfig::from(&config.stress);
    if let Some(ref prompt) = args.prompt {
        test.prompt = prompt.clone();
    }
    if let Some(n) = args.iterations {
        test.iterations = n;
    }
    if let Some(j) = args.concurrent {
        test.concurrent_requests_per_iteration = j;
    }
    if let Some(t) = args.temperature {
        test.temperature = t;
    }
    if let Some(m) = args.max_tokens {
        test.max_tokens = m;
    }
    if let Some(ms) = args.timeout_ms {
        test.timeout_ms = ms;
    }
    test
}

/// Print one progress line per event until the run finishes.
async fn print_progress(mut events: broadcast::Receiver<StressEvent>) {
    let mut stderr = std::io::stderr();
    loop {
        match events.recv().await {
            Ok(StressEvent::Started {
                models,
                total_iterations,
                concurrent_requests_per_iteration,
            }) => {
                let _ = writeln!(
                    stderr,
                    "Stress testing {} ({} iterations x {} concurrent)",
                    models.join(", "),
                    total_iterations,
                    concurrent_requests_per_iteration
                );
            }
            Ok(StressEvent::RequestFinished { result }) => {
                let mark = match result.status {
                    RequestStatus::Completed => "✓",
                    _ => "✗",
                };
                let _ = writeln!(
                    stderr,
                    "  {} {} #{}.{} {}ms",
                    mark, result.model_name, result.iteration, result.slot, result.response_time_ms
                );
            }
            Ok(StressEvent::IterationCompleted {
                iteration,
                total_iterations,
                ..
            }) => {
                let _ = writeln!(stderr, "Iteration {}/{} done", iteration, total_iterations);
            }
            Ok(StressEvent::Finished { .. }) | Err(broadcast::error::RecvError::Closed) => break,
            Ok(StressEvent::RequestStarted { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => {}
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
}

/// Drive a run, turning the first interrupt into a soft stop.
///
/// The first interrupt lets the current iteration finish. A second one
/// drops the run, which fails whatever is still in flight. Either way the
/// partial results stay in the orchestrator for reporting.
pub async fn run_until_interrupted<F, Fut>(
    orchestrator: &StressOrchestrator,
    server: Arc<dyn InferenceServer>,
    models: &[String],
    test: StressTestConfig,
    mut interrupt: F,
) -> Result<RunState, StressError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let run = orchestrator.run(server, models, test);
    tokio::pin!(run);

    tokio::select! {
        state = &mut run => return state,
        _ = interrupt() => {}
    }
    if orchestrator.stop() {
        eprintln!("Stopping after the current iteration, Ctrl-C again to abandon");
    }

    tokio::select! {
        state = &mut run => state,
        _ = interrupt() => {
            eprintln!("Abandoning in-flight requests");
            Ok(RunState::Stopped)
        }
    }
}

/// Summary output for a finished or stopped run.
pub fn render_summary(
    report: &StressReport,
    state: RunState,
    json: bool,
) -> Result<String, serde_json::Error> {
    if json {
        return to_json(&report.summary);
    }
    let mut out = format_stress_summary(&report.summary);
    if state == RunState::Stopped {
        out.push_str("\nRun stopped before all iterations finished");
    }
    Ok(out)
}

/// Handle `llmdeck stress`
pub async fn handle_stress(args: &StressArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = args.connection.load_config()?;
    let server = upstream_server(&config)?;
    let test = build_config(args, &config);

    let orchestrator = StressOrchestrator::new(config.stress.max_models)
        .with_content_logging(config.logging.enable_content_logging);
    let printer = tokio::spawn(print_progress(orchestrator.subscribe()));

    let state = run_until_interrupted(&orchestrator, server, &args.models, test, ctrl_c).await;
    let state = match state {
        Ok(s) => s,
        Err(e) => {
            printer.abort();
            return Err(e.into());
        }
    };
    let _ = printer.await;

    let report = orchestrator.report();
    if let Some(ref path) = args.output {
        report.write_to(path)?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(render_summary(&report, state, args.json)?)
}
