//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resolver_requests_total` (counter): requests by outcome
//! - `resolver_request_duration_seconds` (histogram): time to response head
//! - `resolver_directory_failover_total` (counter): skipped directory endpoints
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one resolved request.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "resolver_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("resolver_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record a directory endpoint being skipped as unavailable.
pub fn record_directory_failover(endpoint_idx: usize) {
    counter!(
        "resolver_directory_failover_total",
        "endpoint" => endpoint_idx.to_string()
    )
    .increment(1);
}
