//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, connections, stored parameters)
//! - Expose a Prometheus-compatible endpoint when configured
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): time from accept to close
//! - `http_active_connections` (gauge): connections currently held by a worker
//! - `params_stored_total` (counter): parameter values appended to the store
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Requests that never produced a status are labelled `none`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: Option<u16>, start: Instant) {
    let status = status.map_or_else(|| "none".to_string(), |code| code.to_string());
    ::metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);
    ::metrics::histogram!("http_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn set_active_connections(count: u64) {
    ::metrics::gauge!("http_active_connections").set(count as f64);
}

pub fn record_params_stored(count: usize) {
    ::metrics::counter!("params_stored_total").increment(count as u64);
}
