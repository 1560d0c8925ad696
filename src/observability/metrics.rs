//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pixie_proxy_requests_total` (counter): forwarded requests by method, status
//! - `pixie_proxy_request_duration_seconds` (histogram): upstream round trip by method

use axum::http::{Method, StatusCode};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

pub const REQUESTS_TOTAL: &str = "pixie_proxy_requests_total";
pub const REQUEST_DURATION: &str = "pixie_proxy_request_duration_seconds";

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one forwarded request and the status reported to the caller.
pub fn record_forward(method: &Method, status: StatusCode, start: Instant) {
    ::metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    ::metrics::histogram!(REQUEST_DURATION, "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}
