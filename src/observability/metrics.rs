//! Metrics collection.
//!
//! # Responsibilities
//! - Define network layer metrics (request outcomes, retries, circuit state, stream status)
//! - Record through the `metrics` facade; the host application picks the exporter
//!
//! # Metrics
//! - `codeword_requests_total` (counter): completed logical requests by method, outcome
//! - `codeword_request_duration_seconds` (histogram): end-to-end latency including retries
//! - `codeword_request_retries_total` (counter): retried attempts by reason
//! - `codeword_circuit_open_total` (counter): circuit openings
//! - `codeword_circuit_rejections_total` (counter): requests rejected while open
//! - `codeword_stream_status` (gauge): 0=connecting, 1=open, 2=closed
//! - `codeword_stream_reconnects_total` (counter): scheduled reconnects
//! - `codeword_stream_dropped_frames_total` (counter): malformed inbound frames
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - `init_metrics` installs a Prometheus exporter for binaries that want one
//! - Labels are low-cardinality (no URLs, no request IDs)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::stream::ConnectionStatus;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed logical request.
pub fn record_request(method: &str, outcome: &'static str, start: Instant) {
    counter!("codeword_requests_total", "method" => method.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("codeword_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a retried attempt.
pub fn record_retry(reason: &'static str) {
    counter!("codeword_request_retries_total", "reason" => reason).increment(1);
}

/// Record the circuit transitioning to open.
pub fn record_circuit_opened() {
    counter!("codeword_circuit_open_total").increment(1);
}

/// Record a request rejected by an open circuit.
pub fn record_circuit_rejection() {
    counter!("codeword_circuit_rejections_total").increment(1);
}

/// Record the current stream status.
pub fn record_stream_status(status: ConnectionStatus) {
    let value = match status {
        ConnectionStatus::Connecting => 0.0,
        ConnectionStatus::Open => 1.0,
        ConnectionStatus::Closed => 2.0,
    };
    gauge!("codeword_stream_status").set(value);
}

/// Record a scheduled reconnect.
pub fn record_reconnect() {
    counter!("codeword_stream_reconnects_total").increment(1);
}

/// Record an inbound frame that failed to decode.
pub fn record_dropped_frame() {
    counter!("codeword_stream_dropped_frames_total").increment(1);
}
