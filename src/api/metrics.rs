//! Prometheus metrics endpoint and HTTP request tracking middleware.
//!
//! This module provides:
//! - A `/metrics` endpoint that returns Prometheus-formatted metrics
//! - Middleware for tracking HTTP request counts and durations
//! - Helper functions to record checkout and ledger events

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

// Metric names as constants for consistency
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const CHECKOUT_VERIFICATIONS_TOTAL: &str = "checkout_verifications_total";
pub const ORDERS_STATUS_UPDATES_TOTAL: &str = "orders_status_updates_total";
pub const LEDGER_BROADCASTS_TOTAL: &str = "ledger_broadcasts_total";
pub const PRODUCTS_TOTAL: &str = "products_total";
pub const ORDERS_TOTAL: &str = "orders_total";

/// Install the Prometheus recorder and return a handle for rendering.
///
/// Call once during startup; a second install fails.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        CHECKOUT_VERIFICATIONS_TOTAL,
        "Payment signature checks by result (verified/rejected)"
    );
    describe_counter!(
        ORDERS_STATUS_UPDATES_TOTAL,
        "Order status changes applied by admins"
    );
    describe_counter!(
        LEDGER_BROADCASTS_TOTAL,
        "Ledger totals pushed to live observers"
    );
    describe_gauge!(PRODUCTS_TOTAL, "Number of products in the catalog");
    describe_gauge!(ORDERS_TOTAL, "Number of recorded orders");

    Ok(handle)
}

/// GET /metrics - Returns Prometheus-formatted metrics.
///
/// This endpoint is accessible without authentication.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    update_gauge_metrics(&state).await;

    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

async fn update_gauge_metrics(state: &AppState) {
    if let Ok(count) = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(&state.db)
        .await
    {
        gauge!(PRODUCTS_TOTAL).set(count as f64);
    }

    if let Ok(count) = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.db)
        .await
    {
        gauge!(ORDERS_TOTAL).set(count as f64);
    }
}

/// Middleware to track HTTP request metrics.
///
/// Records:
/// - `http_requests_total` counter with method, path, and status labels
/// - `http_request_duration_seconds` histogram with method and path labels
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Use the matched route template so ids don't explode label cardinality
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

pub fn record_checkout_verified() {
    counter!(CHECKOUT_VERIFICATIONS_TOTAL, "result" => "verified").increment(1);
}

pub fn record_checkout_rejected() {
    counter!(CHECKOUT_VERIFICATIONS_TOTAL, "result" => "rejected").increment(1);
}

pub fn record_status_update() {
    counter!(ORDERS_STATUS_UPDATES_TOTAL).increment(1);
}

pub fn record_ledger_broadcast() {
    counter!(LEDGER_BROADCASTS_TOTAL).increment(1);
}
