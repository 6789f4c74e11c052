//! corral-api — HTTP surface for the exporter.
//!
//! Two routes: `/metrics` renders every registered series in the
//! Prometheus text format, `/healthz` answers a liveness probe.
//! Collection happens under the model **reader** lock (via
//! [`Exporter::gather`]), so a scrape in progress is never observed
//! half-applied and concurrent scrape requests do not block each other.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use prometheus::{Encoder, TextEncoder};
use tracing::error;

use corral_exporter::Exporter;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub exporter: Arc<Exporter>,
}

/// Build the exporter's router.
pub fn build_router(exporter: Arc<Exporter>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(ApiState { exporter })
}

/// GET /metrics
async fn metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let families = state.exporter.gather().await;

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buffer) {
        error!(error = %err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics")
            .into_response();
    }

    ([(header::CONTENT_TYPE, encoder.format_type())], buffer).into_response()
}

/// GET /healthz
async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
