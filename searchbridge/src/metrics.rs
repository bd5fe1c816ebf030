//! Backend observability metrics
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! embedding application.
//! - Request duration and outcome per work kind
//! - Bulk flush size, payload bytes and duration
//! - Item failures by engine error type
//! - Lifecycle operations by outcome

use std::time::{Duration, Instant};

/// Record duration of one wire round-trip
pub fn record_request_duration(kind: &str, duration: Duration) {
    metrics::histogram!(
        "searchbridge_request_duration_seconds",
        "kind" => kind.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a request that produced its output
pub fn record_request_success(kind: &str) {
    metrics::counter!(
        "searchbridge_requests_total",
        "kind" => kind.to_string(),
        "status" => "ok",
    )
    .increment(1);
}

/// Record a request that failed
pub fn record_request_error(kind: &str, error_type: &str) {
    metrics::counter!(
        "searchbridge_requests_total",
        "kind" => kind.to_string(),
        "status" => "error",
    )
    .increment(1);

    metrics::counter!(
        "searchbridge_request_errors_total",
        "kind" => kind.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Record one bulk flush
pub fn record_bulk_flush(items: usize, bytes: usize, failures: usize, duration: Duration) {
    metrics::histogram!("searchbridge_bulk_flush_items").record(items as f64);
    metrics::histogram!("searchbridge_bulk_flush_bytes").record(bytes as f64);
    metrics::histogram!("searchbridge_bulk_flush_duration_seconds").record(duration.as_secs_f64());
    metrics::counter!("searchbridge_bulk_items_total").increment(items as u64);
    if failures > 0 {
        metrics::counter!("searchbridge_bulk_item_failures_total").increment(failures as u64);
    }
}

/// Record a document rejected inside a bulk request
pub fn record_item_failure(error_type: &str) {
    metrics::counter!(
        "searchbridge_item_failures_total",
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Current number of queued bulk operations in one execution context
pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("searchbridge_bulk_queue_depth").set(depth as f64);
}

/// Record a lifecycle operation (create, validate, rollover, ...) and its outcome
pub fn record_lifecycle_operation(operation: &str, outcome: &str) {
    metrics::counter!(
        "searchbridge_lifecycle_operations_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

/// Guard for timing wire requests
pub struct RequestTimer {
    kind: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            start: Instant::now(),
        }
    }

    /// Record success and duration
    pub fn success(self) {
        record_request_duration(self.kind, self.start.elapsed());
        record_request_success(self.kind);
    }

    /// Record error and duration
    pub fn error(self, error_type: &str) {
        record_request_duration(self.kind, self.start.elapsed());
        record_request_error(self.kind, error_type);
    }
}
