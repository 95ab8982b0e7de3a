//! Health and metrics endpoints shared by every service.
//!
//! - `GET /healthz` → `{"status": "ok", "service": <name>, "version": <VERSION>}`
//! - `GET /metrics` → OpenMetrics text

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus_client::registry::Registry;
use promptgate_core::telemetry::encode_registry;
use serde::Serialize;
use tracing::error;

/// Shared state for the health router.
#[derive(Clone)]
pub struct HealthState {
    /// Service name reported by `/healthz`.
    pub service: &'static str,
    /// Version reported by `/healthz`.
    pub version: String,
    /// Registry exposed at `/metrics`.
    pub registry: Arc<Registry>,
}

/// `/healthz` response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Deployed version.
    pub version: String,
}

/// Router with `/healthz` and `/metrics`.
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn healthz(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.service,
        version: state.version,
    })
}

async fn metrics_handler(State(state): State<HealthState>) -> Response {
    match encode_registry(&state.registry) {
        Ok(buffer) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
