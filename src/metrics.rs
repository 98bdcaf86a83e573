//! Prometheus metrics for request and ledger monitoring.
//!
//! This module provides metrics for:
//! - Status and history request counts
//! - Ledger writes and failures
//! - Snapshot availability
//! - HTTP request latency
//! - Last derived bridge occupancy

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Status requests counter metric name.
pub const METRIC_STATUS_REQUESTS: &str = "status_requests_total";
/// History requests counter metric name.
pub const METRIC_HISTORY_REQUESTS: &str = "history_requests_total";
/// Appended observations counter metric name.
pub const METRIC_OBSERVATIONS_APPENDED: &str = "observations_appended_total";
/// Snapshot unavailable counter metric name.
pub const METRIC_SNAPSHOT_UNAVAILABLE: &str = "snapshot_unavailable_total";
/// Ledger errors counter metric name.
pub const METRIC_LEDGER_ERRORS: &str = "ledger_errors_total";
/// Bridge occupancy gauge metric name.
pub const METRIC_BRIDGE_OCCUPANCY: &str = "bridge_occupancy";

/// Install the Prometheus recorder and register metric descriptions.
/// Call this once at startup.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Initialize all metric descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    describe_counter!(METRIC_STATUS_REQUESTS, "Total number of status requests");
    describe_counter!(METRIC_HISTORY_REQUESTS, "Total number of history requests");
    describe_counter!(
        METRIC_OBSERVATIONS_APPENDED,
        "Total number of traffic observations written to the ledger"
    );
    describe_counter!(
        METRIC_SNAPSHOT_UNAVAILABLE,
        "Status requests rejected because no detection snapshot was usable"
    );
    describe_counter!(METRIC_LEDGER_ERRORS, "Total number of ledger failures");

    describe_gauge!(
        METRIC_BRIDGE_OCCUPANCY,
        "Most recently derived number of vehicles on the bridge"
    );

    debug!("Metrics initialized");
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint).record(latency_ms);
}

/// Increment status requests counter.
pub fn inc_status_requests() {
    counter!(METRIC_STATUS_REQUESTS).increment(1);
}

/// Increment history requests counter.
pub fn inc_history_requests() {
    counter!(METRIC_HISTORY_REQUESTS).increment(1);
}

/// Increment appended observations counter.
pub fn inc_observations_appended() {
    counter!(METRIC_OBSERVATIONS_APPENDED).increment(1);
}

/// Increment snapshot unavailable counter.
pub fn inc_snapshot_unavailable() {
    counter!(METRIC_SNAPSHOT_UNAVAILABLE).increment(1);
}

/// Increment ledger errors counter.
pub fn inc_ledger_errors() {
    counter!(METRIC_LEDGER_ERRORS).increment(1);
}

/// Set the bridge occupancy gauge.
pub fn set_bridge_occupancy(count: u32) {
    gauge!(METRIC_BRIDGE_OCCUPANCY).set(f64::from(count));
}

/// RAII guard for timing HTTP handlers.
/// Records latency when dropped.
pub struct RequestTimer {
    start: Instant,
    endpoint: &'static str,
}

impl RequestTimer {
    /// Start timing a request to `endpoint`.
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        record_http_latency(self.start, self.endpoint);
    }
}
