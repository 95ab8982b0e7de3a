//! gateway: the policy-gated routing endpoint.
//!
//! - `POST /v1/route` → `{allowed: true, result}` | `{allowed: false, reason}`,
//!   or 502 when the PEP or the answer pipeline is unavailable.
//!
//! The route runs on a gateway-owned task, so a client that disconnects
//! mid-request does not cancel the downstream calls or the evidence write.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use promptgate_core::gateway::{Gateway, RouteOutcome};
use promptgate_core::policy::Query;

use crate::error::ApiResult;
use crate::extract::Validated;

/// Service name reported by `/healthz`.
pub const SERVICE_NAME: &str = "gateway";

/// Shared state for the gateway service.
#[derive(Clone)]
pub struct GatewayState {
    /// The orchestrator.
    pub gateway: Arc<Gateway>,
}

/// Routes for the gateway service.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/route", post(route))
        .with_state(state)
}

async fn route(
    State(state): State<GatewayState>,
    Validated(query): Validated<Query>,
) -> ApiResult<Json<RouteOutcome>> {
    Ok(Json(state.gateway.route_detached(query).await?))
}
