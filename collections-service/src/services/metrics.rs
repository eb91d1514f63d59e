//! Prometheus metrics for collections-service.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::time::Instant;

/// HTTP request counter by method, route template and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register http_requests_total")
});

pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "collections_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register http_request_duration")
});

/// Collections recorded, by payment type.
pub static COLLECTIONS_RECORDED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_recorded_total",
        "Total number of collections recorded",
        &["payment_type"]
    )
    .expect("Failed to register collections_recorded")
});

/// Reconciliation results: realized, returned, unmatched, conflict.
pub static RECONCILIATION_OUTCOMES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_reconciliation_outcomes_total",
        "Cheques processed by reconciliation, by outcome",
        &["outcome"]
    )
    .expect("Failed to register reconciliation_outcomes")
});

pub static LEDGER_POSTINGS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_ledger_postings_total",
        "Ledger postings attempted, by kind and result",
        &["kind", "result"]
    )
    .expect("Failed to register ledger_postings")
});

pub static IMPORTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_customer_imports_total",
        "Customer CSV imports, by result",
        &["result"]
    )
    .expect("Failed to register imports_total")
});

pub static EXTRACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_cheque_extractions_total",
        "Cheque image extractions, by outcome",
        &["outcome"]
    )
    .expect("Failed to register extractions_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

pub static STORE_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "collections_store_operation_duration_seconds",
        "Document store operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register store_operation_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&COLLECTIONS_RECORDED);
    Lazy::force(&RECONCILIATION_OUTCOMES);
    Lazy::force(&LEDGER_POSTINGS);
    Lazy::force(&IMPORTS_TOTAL);
    Lazy::force(&EXTRACTIONS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&STORE_OPERATION_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

/// Record request count and latency. Paths are labelled with the matched
/// route template so ids do not explode cardinality.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());
    if response.status().is_server_error() {
        ERRORS_TOTAL.with_label_values(&["http_5xx"]).inc();
    }

    response
}
