//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by action, status
//! - `edge_request_duration_seconds` (histogram): latency by action
//! - `edge_identity_failures_total` (counter): failed token acquisitions
//! - `edge_upstream_failures_total` (counter): failed forwards by target
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is only installed when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request.
pub fn record_request(action: &'static str, status: u16, started: Instant) {
    let status = status.to_string();
    metrics::counter!("edge_requests_total", "action" => action, "status" => status).increment(1);
    metrics::histogram!("edge_request_duration_seconds", "action" => action)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_identity_failure() {
    metrics::counter!("edge_identity_failures_total").increment(1);
}

pub fn record_upstream_failure(target: &'static str) {
    metrics::counter!("edge_upstream_failures_total", "target" => target).increment(1);
}
