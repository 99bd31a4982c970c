//! Prometheus metrics for scan throughput and latency.
//!
//! This module provides metrics for:
//! - Odds API request latency and retries
//! - Sports and events processed per scan
//! - Opportunities detected
//! - Batch save failures and notification delivery
//! - Scan duration

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, warn};

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Scan duration metric name.
pub const METRIC_SCAN_DURATION: &str = "scan_duration_ms";
/// Fetch retries counter metric name.
pub const METRIC_FETCH_RETRIES: &str = "odds_fetch_retries_total";
/// Sports fetched counter metric name.
pub const METRIC_SPORTS_FETCHED: &str = "sports_fetched_total";
/// Sports failed counter metric name.
pub const METRIC_SPORTS_FAILED: &str = "sports_failed_total";
/// Events scanned counter metric name.
pub const METRIC_EVENTS_SCANNED: &str = "events_scanned_total";
/// Events rejected counter metric name.
pub const METRIC_EVENTS_REJECTED: &str = "events_rejected_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Batch save failures counter metric name.
pub const METRIC_BATCH_SAVE_FAILURES: &str = "batch_save_failures_total";
/// Notifications sent counter metric name.
pub const METRIC_NOTIFICATIONS_SENT: &str = "notifications_sent_total";
/// Notifications failed counter metric name.
pub const METRIC_NOTIFICATIONS_FAILED: &str = "notifications_failed_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "Odds API request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SCAN_DURATION,
        "Wall time of one full scan in milliseconds"
    );

    // Counters
    describe_counter!(
        METRIC_FETCH_RETRIES,
        "Total number of retried odds API requests"
    );
    describe_counter!(
        METRIC_SPORTS_FETCHED,
        "Total number of sports fetched successfully"
    );
    describe_counter!(
        METRIC_SPORTS_FAILED,
        "Total number of sports whose fetch failed"
    );
    describe_counter!(METRIC_EVENTS_SCANNED, "Total number of events scanned");
    describe_counter!(
        METRIC_EVENTS_REJECTED,
        "Total number of malformed events skipped"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );
    describe_counter!(
        METRIC_BATCH_SAVE_FAILURES,
        "Total number of opportunity batches that failed to save"
    );
    describe_counter!(
        METRIC_NOTIFICATIONS_SENT,
        "Total number of notifications delivered"
    );
    describe_counter!(
        METRIC_NOTIFICATIONS_FAILED,
        "Total number of notifications that failed"
    );

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and describe all metrics.
///
/// Returns `None` if a recorder is already installed.
pub fn install_prometheus() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            init_metrics();
            Some(handle)
        }
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Record scan duration.
pub fn record_scan_duration(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_SCAN_DURATION).record(latency_ms);
}

/// Increment fetch retries counter.
pub fn inc_fetch_retries() {
    counter!(METRIC_FETCH_RETRIES).increment(1);
}

/// Increment sports fetched counter.
pub fn inc_sports_fetched() {
    counter!(METRIC_SPORTS_FETCHED).increment(1);
}

/// Increment sports failed counter.
pub fn inc_sports_failed() {
    counter!(METRIC_SPORTS_FAILED).increment(1);
}

/// Increment events scanned counter.
pub fn inc_events_scanned() {
    counter!(METRIC_EVENTS_SCANNED).increment(1);
}

/// Increment events rejected counter.
pub fn inc_events_rejected() {
    counter!(METRIC_EVENTS_REJECTED).increment(1);
}

/// Increment opportunities detected counter.
pub fn inc_opportunities_detected() {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(1);
}

/// Increment batch save failures counter.
pub fn inc_batch_save_failures() {
    counter!(METRIC_BATCH_SAVE_FAILURES).increment(1);
}

/// Increment notifications sent counter.
pub fn inc_notifications_sent(channel: &'static str) {
    counter!(METRIC_NOTIFICATIONS_SENT, "channel" => channel).increment(1);
}

/// Increment notifications failed counter.
pub fn inc_notifications_failed(channel: &'static str) {
    counter!(METRIC_NOTIFICATIONS_FAILED, "channel" => channel).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn recording_without_recorder_is_a_noop() {
        let start = Instant::now();
        sleep(Duration::from_millis(5));
        record_http_latency(start, "/sports");
        record_scan_duration(start);
        inc_events_scanned();
        inc_notifications_sent("log");
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
