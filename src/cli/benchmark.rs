//! Benchmark command implementation

use crate::benchmark::run_benchmark;
use crate::cli::output::{format_benchmark, to_json};
use crate::cli::{upstream_server, BenchmarkArgs};
use std::time::Duration;

/// Handle `llmdeck benchmark`
///
/// The suite stops at the first failed test; results gathered so far are
/// reported on stderr before the error is returned.
pub async fn handle_benchmark(args: &BenchmarkArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = args.connection.load_config()?;
    let server = upstream_server(&config)?;
    let timeout = Duration::from_secs(config.server.request_timeout_seconds);

    let outcome = run_benchmark(server.as_ref(), &args.model, timeout, |progress, result| {
        eprintln!(
            "[{}/{}] {}: {} tok/s, {}ms",
            progress.completed,
            progress.total,
            progress.test_name,
            result.tokens_per_second,
            result.response_time_ms
        );
    })
    .await;

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            if !e.completed.is_empty() {
                eprintln!("{} of the tests finished before the failure", e.completed.len());
            }
            return Err(e.into());
        }
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, to_json(&report)?)?;
        eprintln!("Results written to {}", path.display());
    }

    if args.json {
        Ok(to_json(&report)?)
    } else {
        Ok(format_benchmark(&report))
    }
}
