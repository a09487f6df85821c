// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    CACHE_OPERATIONS,
    CACHE_ENTRIES,
    REMOTE_API_CALLS,
    REMOTE_API_DURATION,
};

/// Helper to record cache decisions taken by the manager
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_create() {
    CACHE_OPERATIONS.with_label_values(&["create"]).inc();
}

pub fn record_cache_extend() {
    CACHE_OPERATIONS.with_label_values(&["extend"]).inc();
}

pub fn record_cache_delete() {
    CACHE_OPERATIONS.with_label_values(&["delete"]).inc();
}

pub fn record_cache_invalidate() {
    CACHE_OPERATIONS.with_label_values(&["invalidate"]).inc();
}

pub fn record_cache_failure() {
    CACHE_OPERATIONS.with_label_values(&["failure"]).inc();
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.with_label_values(&["active"]).set(count as f64);
}

/// Helper to record remote cachedContents API calls
pub fn record_remote_call(operation: &str, success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "failure" };
    REMOTE_API_CALLS
        .with_label_values(&[operation, outcome])
        .inc();

    REMOTE_API_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}
