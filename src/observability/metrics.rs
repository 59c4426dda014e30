//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `tenant_sync_reconciliations_total` - Reconciliation passes by outcome
//! - `tenant_sync_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `tenant_sync_source_events_received_total` - Snapshots delivered by each source
//! - `tenant_sync_facet_updates_total` - Facet updates by source and outcome
//! - `tenant_sync_downstream_requests_total` - Downstream HTTP requests by resource, operation and status
//! - `tenant_sync_downstream_request_duration_seconds` - Duration of downstream HTTP requests
//! - `tenant_sync_encoding_failures_total` - Key material that could not be PEM encoded
//! - `tenant_sync_retry_attempts_remaining` - Attempts left before the controller gives up
//! - `tenant_sync_credentials_ready` - 1 once every credential facet is populated

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tenant_sync_reconciliations_total",
            "Total number of reconciliation passes by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "tenant_sync_reconciliation_duration_seconds",
            "Duration of reconciliation passes in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SOURCE_EVENTS_RECEIVED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tenant_sync_source_events_received_total",
            "Total number of snapshots delivered by each credential source",
        ),
        &["source"],
    )
    .expect("Failed to create SOURCE_EVENTS_RECEIVED_TOTAL metric - this should never happen")
});

static FACET_UPDATES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tenant_sync_facet_updates_total",
            "Total number of facet updates by source and outcome",
        ),
        &["source", "outcome"],
    )
    .expect("Failed to create FACET_UPDATES_TOTAL metric - this should never happen")
});

static DOWNSTREAM_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "tenant_sync_downstream_requests_total",
            "Total number of downstream HTTP requests by resource, operation and status",
        ),
        &["resource", "operation", "status"],
    )
    .expect("Failed to create DOWNSTREAM_REQUESTS_TOTAL metric - this should never happen")
});

static DOWNSTREAM_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "tenant_sync_downstream_request_duration_seconds",
            "Duration of downstream HTTP requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["resource", "operation"],
    )
    .expect("Failed to create DOWNSTREAM_REQUEST_DURATION metric - this should never happen")
});

static ENCODING_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tenant_sync_encoding_failures_total",
        "Total number of key materials that could not be PEM encoded",
    )
    .expect("Failed to create ENCODING_FAILURES_TOTAL metric - this should never happen")
});

static RETRY_ATTEMPTS_REMAINING: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "tenant_sync_retry_attempts_remaining",
        "Reconciliation attempts left before the controller gives up",
    )
    .expect("Failed to create RETRY_ATTEMPTS_REMAINING metric - this should never happen")
});

static CREDENTIALS_READY: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "tenant_sync_credentials_ready",
        "1 once every credential facet is populated, 0 otherwise",
    )
    .expect("Failed to create CREDENTIALS_READY metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SOURCE_EVENTS_RECEIVED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FACET_UPDATES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DOWNSTREAM_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DOWNSTREAM_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(ENCODING_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RETRY_ATTEMPTS_REMAINING.clone()))?;
    REGISTRY.register(Box::new(CREDENTIALS_READY.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(outcome: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_source_events_received(source: &str) {
    SOURCE_EVENTS_RECEIVED_TOTAL
        .with_label_values(&[source])
        .inc();
}

pub fn increment_facet_updates(source: &str, outcome: &str) {
    FACET_UPDATES_TOTAL
        .with_label_values(&[source, outcome])
        .inc();
}

/// Record one downstream request; `status` is the HTTP status code or an
/// error class such as `timeout`
pub fn record_downstream_request(resource: &str, operation: &str, status: &str, duration: f64) {
    DOWNSTREAM_REQUESTS_TOTAL
        .with_label_values(&[resource, operation, status])
        .inc();
    DOWNSTREAM_REQUEST_DURATION
        .with_label_values(&[resource, operation])
        .observe(duration);
}

pub fn increment_encoding_failures() {
    ENCODING_FAILURES_TOTAL.inc();
}

pub fn set_retry_attempts_remaining(remaining: u32) {
    RETRY_ATTEMPTS_REMAINING.set(i64::from(remaining));
}

pub fn set_credentials_ready(ready: bool) {
    CREDENTIALS_READY.set(i64::from(ready));
}
