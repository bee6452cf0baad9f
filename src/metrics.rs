// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the reverse proxy operator.
//!
//! All metrics carry the namespace prefix `reverse_proxy_app_scape_de_`
//! (prometheus-safe version of "reverse-proxy.app-scape.de").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - outcomes, duration and requeues
//! - **Child Resource Metrics** - Services, `EndpointSlices` and Ingresses created or deleted
//! - **Finalizer Metrics** - finalizer additions and removals
//! - **Error Metrics** - failures by error type
//!
//! # Example
//!
//! ```rust,no_run
//! use reverse_proxy_operator::metrics::record_reconciliation;
//!
//! record_reconciliation("converged", std::time::Duration::from_millis(40));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "reverse_proxy_app_scape_de";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).expect("valid counter definition");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("counter registered once");
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by outcome
///
/// Labels:
/// - `outcome`: `entry_not_found`, `finalizer_added`, `converged`,
///   `already_finalized`, `finalized` or `error`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "reconciliations_total",
        "Total number of ReverseProxyEntry reconciliations by outcome",
        &["outcome"],
    )
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of ReverseProxyEntry reconciliations in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["outcome"]).expect("valid histogram definition");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("histogram registered once");
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `reason`: Reason for requeue (`cancelled`, `transient`, `error`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "requeues_total",
        "Total number of requeue operations by reason",
        &["reason"],
    )
});

// ============================================================================
// Child Resource Metrics
// ============================================================================

/// Total number of child resources created
///
/// Labels:
/// - `kind`: `Service`, `EndpointSlice` or `Ingress`
pub static CHILD_RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "child_resources_created_total",
        "Total number of child resources created by kind",
        &["kind"],
    )
});

/// Total number of child resources deleted during finalization
///
/// Labels:
/// - `kind`: `Service` or `Ingress`
pub static CHILD_RESOURCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "child_resources_deleted_total",
        "Total number of child resources deleted by kind",
        &["kind"],
    )
});

/// Total number of finalizer edits
///
/// Labels:
/// - `operation`: `add` or `remove`
pub static FINALIZER_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "finalizer_operations_total",
        "Total number of finalizer additions and removals",
        &["operation"],
    )
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of reconcile errors by type
///
/// Labels:
/// - `error_type`: see `ReconcileError::error_type`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "errors_total",
        "Total number of reconcile errors by error type",
        &["error_type"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a finished reconciliation
pub fn record_reconciliation(outcome: &str, duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&[outcome]).inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

/// Record a requeue
pub fn record_requeue(reason: &str) {
    REQUEUE_TOTAL.with_label_values(&[reason]).inc();
}

/// Record a child resource creation
pub fn record_child_created(kind: &str) {
    CHILD_RESOURCES_CREATED_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a child resource deletion
pub fn record_child_deleted(kind: &str) {
    CHILD_RESOURCES_DELETED_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a finalizer addition or removal
pub fn record_finalizer_operation(operation: &str) {
    FINALIZER_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Gather all metrics in Prometheus text format
///
/// # Errors
///
/// Returns an error if metrics encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
