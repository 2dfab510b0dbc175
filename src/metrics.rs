//! Prometheus metrics for the relay.
//!
//! All recording helpers are cheap no-ops until [`init`] installs the global
//! recorder, so library code and tests can call them freely.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder (once per process) and return its handle.
pub fn init() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            // Another recorder may already be installed (e.g. in tests).
            let _ = ::metrics::set_global_recorder(recorder);
            handle
        })
        .clone()
}

/// Count a finished request by endpoint and HTTP status.
pub fn record_request(endpoint: &'static str, status: u16) {
    ::metrics::counter!(
        "relay_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record handler latency since `start`.
pub fn record_duration(endpoint: &'static str, start: Instant) {
    ::metrics::histogram!("relay_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Count an upstream failure (`search` or `stream`).
pub fn record_upstream_error(kind: &'static str) {
    ::metrics::counter!("relay_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn record_cache_hit() {
    ::metrics::counter!("relay_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    ::metrics::counter!("relay_cache_misses_total").increment(1);
}

/// Publish the current physical cache occupancy.
pub fn set_cache_entries(count: usize) {
    ::metrics::gauge!("relay_cache_entries").set(count as f64);
}
