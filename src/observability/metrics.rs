//! Metrics collection and exposition.
//!
//! # Metrics
//! - `certify_requests_total` (counter): requests by endpoint, status
//! - `certify_request_duration_seconds` (histogram): latency by endpoint
//! - `certify_chain_calls_total` (counter): node RPC calls by method, outcome
//! - `certify_confirmation_attempts` (histogram): block fetches per scan, by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`. Must run inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_request(endpoint: &str, status: u16, start: Instant) {
    let endpoint = endpoint.to_string();
    ::metrics::counter!(
        "certify_requests_total",
        "endpoint" => endpoint.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("certify_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// `outcome` is one of `ok`, `rejected`, `unavailable`.
pub fn record_chain_call(method: &'static str, outcome: &'static str) {
    ::metrics::counter!("certify_chain_calls_total", "method" => method, "outcome" => outcome)
        .increment(1);
}

pub fn record_confirmation(attempts: u32, found: bool) {
    let outcome = if found { "found" } else { "timeout" };
    ::metrics::histogram!("certify_confirmation_attempts", "outcome" => outcome)
        .record(attempts as f64);
}
