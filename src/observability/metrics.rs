//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_proxy_requests_total` (counter): proxy responses by method, status
//! - `edge_proxy_upstream_duration_seconds` (histogram): upstream HEAD latency
//! - `edge_websocket_sessions_active` (gauge): open echo sessions
//! - `edge_websocket_messages_echoed_total` (counter): echoed messages by kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a response produced by the proxy handler.
pub fn record_proxy_response(method: &str, status: u16) {
    counter!(
        "edge_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record how long the upstream call took, successful or not.
pub fn record_upstream_latency(start: Instant) {
    histogram!("edge_proxy_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn session_opened() {
    gauge!("edge_websocket_sessions_active").increment(1.0);
}

pub fn session_closed() {
    gauge!("edge_websocket_sessions_active").decrement(1.0);
}

/// Record one echoed message; `kind` is "text" or "binary".
pub fn record_echo(kind: &'static str) {
    counter!("edge_websocket_messages_echoed_total", "kind" => kind).increment(1);
}
