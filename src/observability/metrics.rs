//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define health monitor metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `environment_health_probes_total` (counter): probes by outcome
//! - `environment_health_probe_duration_seconds` (histogram): time to a classification
//! - `environment_health_status` (gauge): 0=pending, 1=booting, 2=healthy, 3=crashed
//! - `environment_health_stale_results_total` (counter): discarded stale results
//! - `environment_health_tracked_environments` (gauge): tracked environment count

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::health::snapshot::Health;

/// Install the Prometheus recorder with its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(outcome: Health, elapsed: Duration) {
    counter!("environment_health_probes_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("environment_health_probe_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_environment_health(environment: &str, health: Health) {
    gauge!("environment_health_status", "environment" => environment.to_string())
        .set(health.gauge_value());
}

pub fn record_stale_result() {
    counter!("environment_health_stale_results_total").increment(1);
}

pub fn record_tracked_environments(count: usize) {
    gauge!("environment_health_tracked_environments").set(count as f64);
}
