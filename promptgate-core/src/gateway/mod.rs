//! Gateway: the policy-gated routing pipeline.
//!
//! One call to [`Gateway::route`] walks a single query through
//! [`RouteStage`]s, strictly in sequence:
//!
//! 1. **PEP**: obtain a [`Decision`]. Failure ends the route with an upstream
//!    error and nothing downstream is called.
//! 2. **Deny**: return the reason. No answer, no evidence.
//! 3. **Redact**: mask every occurrence of each mask term, in order.
//! 4. **Answer**: call the answer pipeline with the redacted prompt and the
//!    original labels. Failure ends the route; no evidence is written.
//! 5. **Evidence**: hand a `gateway_log` record to a detached, tracked task
//!    and return immediately. The task's outcome never reaches the caller;
//!    failures are counted and logged.
//!
//! Each network stage runs under its own timeout (see [`StageTimeouts`]).
//! Nothing is retried. HTTP handlers go through [`Gateway::route_detached`],
//! which runs the route on its own tracked task so a client that goes away
//! does not cancel the downstream calls or the evidence write.

mod stage;

pub use stage::RouteStage;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, warn};

use crate::answer::{AnswerPipeline, AnswerRequest, AnswerResponse};
use crate::config::Timeouts;
use crate::enforcement::PolicyDecider;
use crate::error::{Origin, PromptGateError};
use crate::evidence::{EvidenceRecord, EvidenceSink, GATEWAY_LOG_KIND};
use crate::policy::{Decision, Query, Verdict};
use crate::redact::redact_prompt;
use crate::telemetry::PromptGateMetrics;
use crate::transport::duration_ms;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Time bound of each gateway stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    /// PEP consultation.
    pub pep: Duration,
    /// Answer pipeline call.
    pub answer: Duration,
    /// Evidence append.
    pub evidence: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self::from(&Timeouts::default())
    }
}

impl From<&Timeouts> for StageTimeouts {
    fn from(t: &Timeouts) -> Self {
        Self {
            pep: t.pep,
            answer: t.answer,
            evidence: t.evidence,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Successful result of a route.
///
/// Serializes as `{"allowed": true, "result": ...}` or
/// `{"allowed": false, "reason": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// The prompt was answered.
    Allowed {
        /// Answer pipeline payload, relayed as received.
        result: AnswerResponse,
    },
    /// The policy denied the prompt.
    Denied {
        /// Reason given by the PDP.
        reason: String,
    },
}

impl RouteOutcome {
    /// Returns true for [`RouteOutcome::Allowed`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

impl Serialize for RouteOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RouteOutcome", 2)?;
        match self {
            Self::Allowed { result } => {
                state.serialize_field("allowed", &true)?;
                state.serialize_field("result", result)?;
            }
            Self::Denied { reason } => {
                state.serialize_field("allowed", &false)?;
                state.serialize_field("reason", reason)?;
            }
        }
        state.end()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────────────────

/// Orchestrates PEP → redaction → answer pipeline → evidence.
pub struct Gateway {
    pep: Arc<dyn PolicyDecider>,
    answers: Arc<dyn AnswerPipeline>,
    evidence: Arc<dyn EvidenceSink>,
    timeouts: StageTimeouts,
    tracker: TaskTracker,
    evidence_failures: Arc<AtomicU64>,
    metrics: Option<Arc<PromptGateMetrics>>,
}

impl Gateway {
    /// Assemble a gateway from its three collaborators.
    pub fn new(
        pep: Arc<dyn PolicyDecider>,
        answers: Arc<dyn AnswerPipeline>,
        evidence: Arc<dyn EvidenceSink>,
        timeouts: StageTimeouts,
    ) -> Self {
        Self {
            pep,
            answers,
            evidence,
            timeouts,
            tracker: TaskTracker::new(),
            evidence_failures: Arc::new(AtomicU64::new(0)),
            metrics: None,
        }
    }

    /// Record decisions, routes and failures in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<PromptGateMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Stage timeouts in force.
    pub fn timeouts(&self) -> StageTimeouts {
        self.timeouts
    }

    /// Number of evidence appends that failed so far.
    pub fn evidence_failures(&self) -> u64 {
        self.evidence_failures.load(Ordering::Relaxed)
    }

    /// Number of detached tasks (routes and evidence writes) still running.
    pub fn pending_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Route `query` on a tracked task of its own.
    ///
    /// Dropping the returned future (e.g. when the client disconnects) does
    /// not cancel the route: the PEP and answer pipeline calls complete and
    /// the evidence record is still written.
    ///
    /// # Errors
    ///
    /// Same as [`Gateway::route`], plus [`PromptGateError::Internal`] if the
    /// route task panicked.
    pub async fn route_detached(
        self: &Arc<Self>,
        query: Query,
    ) -> Result<RouteOutcome, PromptGateError> {
        let gateway = Arc::clone(self);
        let handle = self
            .tracker
            .spawn(async move { gateway.route(&query).await }.in_current_span());
        handle.await.map_err(|e| PromptGateError::Internal {
            details: format!("route task failed: {e}"),
        })?
    }

    /// Route one query.
    ///
    /// # Errors
    ///
    /// Returns an upstream error with origin [`Origin::Pep`] or
    /// [`Origin::AnswerPipeline`] when that stage fails. A denial is not an
    /// error. Evidence failures are never returned.
    #[tracing::instrument(skip_all, fields(sensitivity = ?query.sensitivity))]
    pub async fn route(&self, query: &Query) -> Result<RouteOutcome, PromptGateError> {
        let mut stage = RouteStage::Init;

        let decision = match self.consult_pep(query).await {
            Ok(decision) => decision,
            Err(e) => return Err(self.fail(&mut stage, e)),
        };
        advance(&mut stage, RouteStage::Decided);
        if let Some(metrics) = &self.metrics {
            metrics.record_decision(decision.verdict());
        }

        if decision.verdict() == Verdict::Deny {
            advance(&mut stage, RouteStage::Denied);
            self.record_route("denied");
            return Ok(RouteOutcome::Denied {
                reason: decision.reason().to_string(),
            });
        }

        let request = AnswerRequest {
            prompt: redact_prompt(&query.prompt, decision.mask_terms()),
            labels: query.labels.clone(),
        };
        advance(&mut stage, RouteStage::Redacted);

        let result = match self.call_answer_pipeline(&request).await {
            Ok(result) => result,
            Err(e) => return Err(self.fail(&mut stage, e)),
        };
        advance(&mut stage, RouteStage::Answered);

        self.spawn_evidence(decision.verdict());
        advance(&mut stage, RouteStage::Done);
        self.record_route("allowed");

        Ok(RouteOutcome::Allowed { result })
    }

    /// Wait for every detached route and evidence task spawned so far.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Wait up to `limit` for outstanding route and evidence tasks.
    ///
    /// Returns false if tasks were still running when the limit elapsed.
    pub async fn drain(&self, limit: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(limit, self.tracker.wait())
            .await
            .is_ok();
        if !drained {
            warn!(
                pending = self.tracker.len(),
                "Gateway tasks still running at shutdown"
            );
        }
        drained
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stages
    // ─────────────────────────────────────────────────────────────────────────

    async fn consult_pep(&self, query: &Query) -> Result<Decision, PromptGateError> {
        let decision = with_timeout(Origin::Pep, self.timeouts.pep, self.pep.decide(query))
            .await
            .map_err(|e| e.with_origin(Origin::Pep))?;
        decision
            .validate()
            .map_err(|details| PromptGateError::UpstreamInvalidResponse {
                origin: Origin::Pep,
                details,
            })?;
        Ok(decision)
    }

    async fn call_answer_pipeline(
        &self,
        request: &AnswerRequest,
    ) -> Result<AnswerResponse, PromptGateError> {
        with_timeout(
            Origin::AnswerPipeline,
            self.timeouts.answer,
            self.answers.answer(request),
        )
        .await
        .map_err(|e| e.with_origin(Origin::AnswerPipeline))
    }

    fn spawn_evidence(&self, verdict: Verdict) {
        let sink = Arc::clone(&self.evidence);
        let failures = Arc::clone(&self.evidence_failures);
        let metrics = self.metrics.clone();
        let limit = self.timeouts.evidence;
        let record = EvidenceRecord::new(GATEWAY_LOG_KIND, Some(verdict.as_str().to_string()));

        self.tracker.spawn(
            async move {
                match with_timeout(Origin::EvidenceStore, limit, sink.append(record)).await {
                    Ok(count) => debug!(count, "Evidence recorded"),
                    Err(e) => {
                        let e = e.with_origin(Origin::EvidenceStore);
                        failures.fetch_add(1, Ordering::Relaxed);
                        if let Some(metrics) = &metrics {
                            metrics.record_evidence_failure();
                            metrics.record_upstream_failure(&e);
                        }
                        warn!(
                            origin = Origin::EvidenceStore.as_str(),
                            error = %e,
                            "Evidence logging failed, response unaffected"
                        );
                    }
                }
            }
            .in_current_span(),
        );
    }

    fn fail(&self, stage: &mut RouteStage, error: PromptGateError) -> PromptGateError {
        advance(stage, RouteStage::Failed);
        warn!(
            origin = error.origin().map(|o| o.as_str()),
            error_type = error.error_type_name(),
            error = %error,
            "Route failed"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_upstream_failure(&error);
        }
        self.record_route("failed");
        error
    }

    fn record_route(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_route(outcome);
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("timeouts", &self.timeouts)
            .field("evidence_failures", &self.evidence_failures())
            .finish_non_exhaustive()
    }
}

fn advance(stage: &mut RouteStage, next: RouteStage) {
    debug_assert!(
        stage.can_transition_to(next),
        "illegal route transition {stage} -> {next}"
    );
    debug!(from = %stage, to = %next, "Route stage");
    *stage = next;
}

async fn with_timeout<T>(
    origin: Origin,
    limit: Duration,
    fut: impl Future<Output = Result<T, PromptGateError>>,
) -> Result<T, PromptGateError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(PromptGateError::UpstreamTimeout {
            origin,
            timeout_ms: duration_ms(limit),
        }),
    }
}
