//! Metrics collection and export.
//!
//! Uses the `metrics` crate for instrumentation and exports to Prometheus
//! format when enabled.

use beacon_core::{DecodeError, EventLogger, TracingLogger};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const EVENTS_TOTAL: &str = "beacon_events_total";
    pub const DECODE_FAILURES_TOTAL: &str = "beacon_decode_failures_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(names::EVENTS_TOTAL, "Observe events decoded and handled");
    metrics::describe_counter!(
        names::DECODE_FAILURES_TOTAL,
        "Observe events skipped because the payload did not decode"
    );

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a handled event.
pub fn record_event(event: &str) {
    counter!(names::EVENTS_TOTAL, "event" => event.to_string()).increment(1);
}

/// Logs decode failures through `tracing` and counts them.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsLogger;

impl EventLogger for MetricsLogger {
    fn decode_failed(&self, topic: &str, event: &str, error: &DecodeError) {
        counter!(names::DECODE_FAILURES_TOTAL, "event" => event.to_string()).increment(1);
        TracingLogger.decode_failed(topic, event, error);
    }
}
