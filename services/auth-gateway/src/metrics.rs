//! Prometheus metrics exposition
//!
//! Gateway-level metrics recorded here:
//!
//! - `gateway_requests_total` (counter): labels `status`, `method`
//! - `gateway_request_duration_seconds` (histogram): label `status`
//!
//! The session and share crates record their own `auth_*` and `share_*`
//! series through the same global recorder.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("gateway_request_duration_seconds".to_string()),
        DURATION_BUCKETS,
    )
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Request durations render as a histogram (with `_bucket` lines) rather than
/// the default summary. Buckets run from 1ms to 10s; the slowest requests are
/// callbacks bounded by the provider timeout.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record a completed request with status code and HTTP method labels.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("gateway_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "status" => status_str)
        .record(duration_secs);
}

/// In-process counters behind `/health`.
#[derive(Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    #[test]
    fn record_request_does_not_panic_without_recorder() {
        record_request(200, "GET", 0.05);
    }

    /// Isolated recorder/handle pair; install_recorder() may only succeed
    /// once per process.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_request_increments_counter_and_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request(200, "GET", 0.004);
        record_request(401, "POST", 0.2);

        let output = handle.render();
        assert!(output.contains("gateway_requests_total"));
        assert!(output.contains("status=\"401\""));
        assert!(output.contains("method=\"POST\""));
        assert!(output.contains("gateway_request_duration_seconds_bucket"));
        assert!(output.contains("le=\"0.005\""));
        assert!(output.contains("le=\"+Inf\""));
    }

    #[test]
    fn library_metrics_share_the_recorder() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        metrics::counter!("auth_logins_total", "result" => "completed").increment(1);
        metrics::gauge!("auth_sessions_active").set(3.0);

        let output = handle.render();
        assert!(output.contains("auth_logins_total{result=\"completed\"} 1"));
        assert!(output.contains("auth_sessions_active 3"));
    }

    #[test]
    fn service_metrics_start_at_zero() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.requests_served(), 0);
        metrics.requests_total.fetch_add(2, Ordering::Relaxed);
        assert_eq!(metrics.clone().requests_served(), 2);
        assert!(metrics.uptime_secs() < 5);
    }
}
