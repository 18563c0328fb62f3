//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_decisions_total` (counter): outcome, surface
//! - `gatekeeper_rate_limited_total` (counter): scope (route name or concern)
//! - `gatekeeper_session_failures_total` (counter)
//! - `gatekeeper_rate_records` (gauge): live window records
//! - `gatekeeper_request_duration_seconds` (histogram): status, surface
//!
//! All recorders are no-ops until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(outcome: &'static str, surface: &'static str) {
    counter!("gatekeeper_decisions_total", "outcome" => outcome, "surface" => surface).increment(1);
}

pub fn record_rate_limited(scope: &str) {
    counter!("gatekeeper_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

pub fn record_session_failure() {
    counter!("gatekeeper_session_failures_total").increment(1);
}

pub fn record_rate_records(len: usize) {
    gauge!("gatekeeper_rate_records").set(len as f64);
}

pub fn record_request(status: u16, surface: &'static str, start: Instant) {
    histogram!(
        "gatekeeper_request_duration_seconds",
        "status" => status.to_string(),
        "surface" => surface
    )
    .record(start.elapsed().as_secs_f64());
}
