//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define composer metrics (requests, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `composer_requests_total` (counter): composed requests by route, status
//! - `composer_request_duration_seconds` (histogram): time until the envelope was ready
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for route and status code
//! - Status `200` for fire-and-forget requests: only the acknowledgement is observed

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "composer_requests_total";
pub const REQUEST_DURATION: &str = "composer_request_duration_seconds";

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one compose call.
pub fn record_compose(route: &'static str, status: u16, start: Instant) {
    counter!(REQUESTS_TOTAL, "route" => route, "status" => status.to_string()).increment(1);
    histogram!(REQUEST_DURATION, "route" => route).record(start.elapsed().as_secs_f64());
}
