//! # Metrics
//!
//! Prometheus export for proxy and stress traffic, served at `GET /metrics`.
//!
//! **Counters:**
//! - `llmdeck_proxy_requests_total{route, status}` - Proxied dashboard calls
//! - `llmdeck_stress_requests_total{model, status}` - Stress requests by outcome
//!
//! **Histograms:**
//! - `llmdeck_proxy_request_duration_seconds{route}` - Proxy call duration
//! - `llmdeck_stress_response_seconds{model}` - Stress request wall-clock time
//!
//! **Gauges:**
//! - `llmdeck_uptime_seconds` - Refreshed on each scrape

pub mod handler;

pub use metrics_exporter_prometheus::PrometheusBuilder;

use metrics_exporter_prometheus::PrometheusHandle;
use std::time::{Duration, Instant};

pub const PROXY_REQUESTS_TOTAL: &str = "llmdeck_proxy_requests_total";
pub const PROXY_REQUEST_DURATION: &str = "llmdeck_proxy_request_duration_seconds";
pub const STRESS_REQUESTS_TOTAL: &str = "llmdeck_stress_requests_total";
pub const STRESS_RESPONSE_SECONDS: &str = "llmdeck_stress_response_seconds";

/// Holds the Prometheus handle and process start time.
pub struct MetricsCollector {
    start_time: Instant,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(start_time: Instant, prometheus_handle: PrometheusHandle) -> Self {
        Self {
            start_time,
            prometheus_handle,
        }
    }

    /// Install the global recorder, or fall back to a detached one if a
    /// recorder is already installed (several app states in one process).
    pub fn install(start_time: Instant) -> Self {
        let handle = setup_metrics().unwrap_or_else(|e| {
            tracing::debug!("Metrics already initialized, creating new handle: {}", e);
            PrometheusBuilder::new().build_recorder().handle()
        });
        Self::new(start_time, handle)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Count one proxied call and record its duration.
pub fn record_proxy_request(route: &'static str, status: u16, elapsed: Duration) {
    metrics::counter!(PROXY_REQUESTS_TOTAL, "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!(PROXY_REQUEST_DURATION, "route" => route).record(elapsed.as_secs_f64());
}

/// Initialize Prometheus metrics exporter with custom histogram buckets.
///
/// Buckets are in seconds and stretch to five minutes, which covers slow
/// local generations on CPU-only hosts.
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let duration_buckets = &[
        0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(PROXY_REQUEST_DURATION.to_string()),
            duration_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(STRESS_RESPONSE_SECONDS.to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_uptime_starts_near_zero() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let collector = MetricsCollector::new(Instant::now(), handle);
        assert!(collector.uptime_seconds() < 1);
    }

    #[test]
    fn test_detached_recorder_captures_proxy_counter() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_proxy_request("models", 200, Duration::from_millis(20));
        });

        let rendered = handle.render();
        assert!(rendered.contains(PROXY_REQUESTS_TOTAL));
        assert!(rendered.contains("route=\"models\""));
    }

    #[test]
    fn test_install_twice_does_not_panic() {
        let first = MetricsCollector::install(Instant::now());
        let second = MetricsCollector::install(Instant::now());
        let _ = first.render_metrics();
        let _ = second.render_metrics();
    }
}
