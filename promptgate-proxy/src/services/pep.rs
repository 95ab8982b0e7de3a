//! pep: the Policy Enforcement Point service.
//!
//! - `POST /v1/decide`: forwards the query to the PDP, relays its decision.
//!   A PDP failure is a 502, never a verdict.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use promptgate_core::enforcement::EnforcementPoint;
use promptgate_core::policy::{Decision, Query};
use promptgate_core::telemetry::PromptGateMetrics;

use crate::error::ApiResult;
use crate::extract::Validated;

/// Service name reported by `/healthz`.
pub const SERVICE_NAME: &str = "pep";

/// Shared state for the pep service.
#[derive(Clone)]
pub struct PepState {
    /// Enforcement point wrapping the PDP client.
    pub pep: EnforcementPoint,
    /// Metrics.
    pub metrics: Arc<PromptGateMetrics>,
}

/// Routes for the pep service.
pub fn router(state: PepState) -> Router {
    Router::new()
        .route("/v1/decide", post(decide))
        .with_state(state)
}

async fn decide(
    State(state): State<PepState>,
    Validated(query): Validated<Query>,
) -> ApiResult<Json<Decision>> {
    match state.pep.enforce(&query).await {
        Ok(decision) => {
            state.metrics.record_decision(decision.verdict());
            Ok(Json(decision))
        }
        Err(e) => {
            state.metrics.record_upstream_failure(&e);
            Err(e.into())
        }
    }
}
