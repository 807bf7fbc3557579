//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Expose a Prometheus-compatible metrics endpoint
//! - Record per-request counters and latency
//! - Periodically publish module counts and the per-minute rate
//!   counters, starting after a fixed delay once serving has begun
//!
//! # Design Decisions
//! - Exporter failures are logged and never affect serving
//! - The reporter polls; counters are never pushed from the hot path

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::module::ModuleRegistry;
use crate::observability::counters::RateCounters;

/// Delay before the reporter publishes its first sample.
const REPORT_STARTUP_DELAY: Duration = Duration::from_secs(10);

/// Interval between reporter samples.
const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Install the Prometheus exporter on the given address.
///
/// A failure here disables metrics exposition but must not take the
/// server down with it.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed HTTP exchange.
pub fn record_request(method: &str, status: u16, start_time: Instant) {
    counter!(
        "modgate_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!("modgate_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

/// Record one completed WebSocket upgrade.
pub fn record_upgrade() {
    counter!("modgate_websocket_upgrades_total").increment(1);
}

/// Spawn the background reporter publishing registry and rate-counter
/// gauges on a fixed schedule.
pub fn spawn_reporter(registry: Arc<ModuleRegistry>, counters: Arc<RateCounters>) {
    tokio::spawn(async move {
        tokio::time::sleep(REPORT_STARTUP_DELAY).await;
        let mut interval = tokio::time::interval(REPORT_INTERVAL);
        loop {
            interval.tick().await;
            gauge!("modgate_request_modules").set(registry.request_module_count() as f64);
            gauge!("modgate_stream_modules").set(registry.stream_module_count() as f64);
            gauge!("modgate_http_requests_per_minute").set(counters.http.current() as f64);
            gauge!("modgate_websocket_upgrades_per_minute")
                .set(counters.websocket.current() as f64);
        }
    });
}
