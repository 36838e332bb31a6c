//! Prometheus metrics for the status board.
//!
//! Exposed at `GET /metrics` in Prometheus text format.
//!
//! # Metrics Exposed
//!
//! ## Request Metrics
//! - `statusboard_http_requests_total` - Total HTTP requests (labels: method, path, status)
//! - `statusboard_http_request_duration_seconds` - Request duration histogram
//!
//! ## Registry Metrics
//! - `statusboard_registry_operations_total` - Registry operations (labels: operation)
//! - `statusboard_expirations_total` - Records removed by their expiry timer
//! - `statusboard_services` - Current number of registered services
//!
//! ## Display Metrics
//! - `statusboard_display_writes_total` - Device writes (labels: outcome)
//! - `statusboard_print_queue_depth` - Writes queued or in flight
//! - `statusboard_stats_ticks_skipped_total` - Stats ticks dropped by backpressure

#![allow(clippy::cast_precision_loss)]

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder.
///
/// Must be called once at startup. Metrics recorded before this are lost.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    Ok(handle)
}

/// Gets the global Prometheus handle.
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

fn register_metrics() {
    describe_counter!(
        "statusboard_http_requests_total",
        "Total number of HTTP requests"
    );
    describe_histogram!(
        "statusboard_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    describe_counter!(
        "statusboard_registry_operations_total",
        "Total registry operations"
    );
    describe_counter!(
        "statusboard_expirations_total",
        "Services removed because their expiry elapsed"
    );
    describe_gauge!("statusboard_services", "Number of registered services");

    describe_counter!(
        "statusboard_display_writes_total",
        "Display writes by outcome"
    );
    describe_gauge!(
        "statusboard_print_queue_depth",
        "Display writes queued or in flight"
    );
    describe_counter!(
        "statusboard_stats_ticks_skipped_total",
        "Stats ticks skipped because the print queue was saturated"
    );
}

// =============================================================================
// HTTP Metrics
// =============================================================================

/// Records an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let path = normalize_path(path);

    counter!(
        "statusboard_http_requests_total",
        "method" => method.to_string(),
        "path" => path.clone(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "statusboard_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path
    )
    .record(duration_secs);
}

/// Replaces service names with a placeholder so label cardinality stays
/// bounded.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        ["v1", "status", _] => "/v1/status/:service".to_string(),
        _ => format!("/{}", segments.join("/")),
    }
}

// =============================================================================
// Registry Metrics
// =============================================================================

/// Records a registry operation (`upsert`, `put`, `delete`, `set_expiry`).
pub fn record_registry_operation(operation: &'static str) {
    counter!(
        "statusboard_registry_operations_total",
        "operation" => operation
    )
    .increment(1);
}

/// Records a record removed by its expiry timer.
pub fn record_expiration() {
    counter!("statusboard_expirations_total").increment(1);
}

/// Sets the number of registered services.
pub fn set_service_count(count: usize) {
    gauge!("statusboard_services").set(count as f64);
}

// =============================================================================
// Display Metrics
// =============================================================================

/// Records the outcome of one device write.
pub fn record_display_write(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!(
        "statusboard_display_writes_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Sets the print queue depth.
pub fn set_print_queue_depth(depth: usize) {
    gauge!("statusboard_print_queue_depth").set(depth as f64);
}

/// Records a skipped stats tick.
pub fn record_stats_tick_skipped() {
    counter!("statusboard_stats_ticks_skipped_total").increment(1);
}

// =============================================================================
// Metrics Rendering
// =============================================================================

/// Renders all metrics in Prometheus text format.
pub fn render_metrics() -> String {
    match get_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}
