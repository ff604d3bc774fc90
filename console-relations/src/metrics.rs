//! Prometheus metrics for relation reconciliation.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

/// Attach/detach calls issued against the backend, by relation and outcome.
pub static RELATION_OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "relation_operations_total",
        "Total number of relation attach/detach calls",
        &["relation", "operation", "status"]
    )
    .expect("Failed to register RELATION_OPERATIONS")
});

/// Reconciliations skipped because desired and initial membership were equal.
pub static RECONCILE_NOOPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "relation_reconcile_noops_total",
        "Total number of reconciliations that issued no calls",
        &["relation"]
    )
    .expect("Failed to register RECONCILE_NOOPS")
});

/// Record one attach or detach call.
pub fn record_relation_call(relation: &str, operation: &str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    RELATION_OPERATIONS
        .with_label_values(&[relation, operation, status])
        .inc();
}

/// Record a reconciliation that issued no calls.
pub fn record_noop(relation: &str) {
    RECONCILE_NOOPS.with_label_values(&[relation]).inc();
}

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&RELATION_OPERATIONS);
    Lazy::force(&RECONCILE_NOOPS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
