//! Metrics module
//!
//! Prometheus metrics for requests, uploads and log rotation.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Histogram,
};

lazy_static! {
    // Request metrics
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "fileserver_requests_total",
        "Total HTTP requests",
        &["route", "method"]
    ).unwrap();

    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "fileserver_uploads_total",
        "Total number of uploads",
        &["status", "stage"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "fileserver_upload_bytes_total",
        "Total bytes uploaded"
    ).unwrap();

    pub static ref UPLOAD_DURATION: Histogram = register_histogram!(
        "fileserver_upload_duration_seconds",
        "Upload duration in seconds",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 60.0]
    ).unwrap();

    // Log rotation metrics
    pub static ref LOG_ROTATIONS: CounterVec = register_counter_vec!(
        "fileserver_log_rotations_total",
        "Log file rotations",
        &["status"]
    ).unwrap();
}

/// Record an incoming request
pub fn record_request(route: &str, method: &str) {
    REQUESTS_TOTAL.with_label_values(&[route, method]).inc();
}

/// Record a stored upload
pub fn record_upload_success(bytes: u64, duration_secs: f64) {
    UPLOADS_TOTAL.with_label_values(&["success", "done"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
    UPLOAD_DURATION.observe(duration_secs);
}

/// Record a failed upload and the stage it failed in
pub fn record_upload_failure(stage: &str) {
    UPLOADS_TOTAL.with_label_values(&["failure", stage]).inc();
}

/// Record a log rotation attempt
pub fn record_rotation(success: bool) {
    let status = if success { "success" } else { "failure" };
    LOG_ROTATIONS.with_label_values(&[status]).inc();
}
