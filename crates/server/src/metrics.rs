//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric descriptions, including the scan and cache counters the data
//!   tier emits
//! - Request and sync recording helpers
//! - Request-timing middleware

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("crysta_requests_total", "Total number of API requests");
    describe_histogram!(
        "crysta_request_duration_seconds",
        "Duration of API requests in seconds"
    );
    describe_counter!(
        "crysta_degraded_responses_total",
        "Responses served with empty data after a backend failure"
    );

    describe_counter!("crysta_scan_pages_total", "Pages fetched by full-table scans");
    describe_counter!("crysta_scan_rows_total", "Rows fetched by full-table scans");
    describe_counter!(
        "crysta_scan_truncated_total",
        "Scans stopped by their page ceiling"
    );

    describe_counter!("crysta_cache_hits_total", "Aggregate cache hits");
    describe_counter!("crysta_cache_misses_total", "Aggregate cache misses");
    describe_counter!("crysta_sync_total", "Manual cache refreshes");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record a completed API request.
///
/// `endpoint` is the matched route template, e.g. `/api/leads`.
pub fn record_request(endpoint: &str, status: &str, duration: Duration) {
    counter!("crysta_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("crysta_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

/// Record a manual refresh that dropped `cleared` cache entries.
pub fn record_sync(cleared: usize, duration: Duration) {
    counter!("crysta_sync_total").increment(1);
    tracing::info!(
        cleared,
        duration_ms = duration.as_millis() as u64,
        "Cache refresh completed"
    );
}

/// Middleware timing every routed request under its route template.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();
    let response = next.run(request).await;
    record_request(&endpoint, response.status().as_str(), start.elapsed());
    response
}
