//! Metrics collection and exposition.
//!
//! # Metrics
//! - `waypoint_requests_total` (counter): requests by chain outcome and status
//! - `waypoint_dispatch_duration_seconds` (histogram): match + dispatch latency
//! - `waypoint_matches_per_request` (histogram): size of the match list
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: no paths, no parameter values

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(outcome: &'static str, status: u16, matches: usize, start: Instant) {
    metrics::counter!(
        "waypoint_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("waypoint_dispatch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
    metrics::histogram!("waypoint_matches_per_request").record(matches as f64);
}
