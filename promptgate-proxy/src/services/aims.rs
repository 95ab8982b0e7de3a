//! aims: hosts the Policy Decision Point and the evidence store.
//!
//! - `POST /v1/pdp/decide` → `{decision, reason, mask_terms?}`
//! - `POST /v1/evidence` → `{ok: true, count}`
//! - `GET /v1/evidence` → `{items: [...]}` (last 100, oldest first)

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use promptgate_core::evidence::{EvidenceRecord, EvidenceStore};
use promptgate_core::policy::{Decision, PolicyDecisionPoint, Query};
use promptgate_core::telemetry::PromptGateMetrics;
use serde::Serialize;
use tracing::debug;

use crate::extract::Validated;

/// Service name reported by `/healthz`.
pub const SERVICE_NAME: &str = "aims";

/// Shared state for the aims service.
#[derive(Clone)]
pub struct AimsState {
    /// Rule evaluator.
    pub pdp: PolicyDecisionPoint,
    /// Process-wide evidence log.
    pub evidence: Arc<EvidenceStore>,
    /// Metrics.
    pub metrics: Arc<PromptGateMetrics>,
}

/// `POST /v1/evidence` response body.
#[derive(Debug, Serialize)]
pub struct AppendResponse {
    /// Always true.
    pub ok: bool,
    /// Records ever appended.
    pub count: u64,
}

/// `GET /v1/evidence` response body.
#[derive(Debug, Serialize)]
pub struct RecentResponse {
    /// Most recent records, oldest first.
    pub items: Vec<EvidenceRecord>,
}

/// Routes for the aims service.
pub fn router(state: AimsState) -> Router {
    Router::new()
        .route("/v1/pdp/decide", post(decide))
        .route("/v1/evidence", post(append_evidence).get(recent_evidence))
        .with_state(state)
}

async fn decide(
    State(state): State<AimsState>,
    Validated(query): Validated<Query>,
) -> Json<Decision> {
    let decision = state.pdp.decide(&query);
    state.metrics.record_decision(decision.verdict());
    Json(decision)
}

async fn append_evidence(
    State(state): State<AimsState>,
    Validated(record): Validated<EvidenceRecord>,
) -> Json<AppendResponse> {
    let count = state.evidence.push(record);
    state.metrics.set_evidence_records(count);
    debug!(count, "Evidence appended");
    Json(AppendResponse { ok: true, count })
}

async fn recent_evidence(State(state): State<AimsState>) -> Json<RecentResponse> {
    Json(RecentResponse {
        items: state.evidence.recent(),
    })
}
