//! Prometheus metrics using the prometheus-client crate.
//!
//! [`PromptGateMetrics`] is registered once per process and shared through an
//! `Arc`. Every service exposes the registry at `GET /metrics` in OpenMetrics
//! text format. prometheus-client appends `_total` to counter names on
//! encoding, so counters are registered without the suffix.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::error::PromptGateError;
use crate::policy::Verdict;

// ─────────────────────────────────────────────────────────────────────────────
// Label Sets
// ─────────────────────────────────────────────────────────────────────────────

/// Labels for policy decision counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DecisionLabels {
    /// "allow", "deny" or "modify"
    pub verdict: String,
}

/// Labels for gateway route counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RouteLabels {
    /// "allowed", "denied" or "failed"
    pub outcome: String,
}

/// Labels for upstream failure counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct UpstreamFailureLabels {
    /// Component that failed (e.g. "pep", "answer_pipeline")
    pub origin: String,
    /// Error classification (e.g. "upstream_timeout")
    pub kind: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// PromptGateMetrics
// ─────────────────────────────────────────────────────────────────────────────

/// Prometheus metrics for PromptGate.
///
/// Not every service updates every metric: the gauge is only moved by the
/// evidence store host (aims), route counters only by the gateway.
#[derive(Debug)]
pub struct PromptGateMetrics {
    /// Decisions produced or relayed, by verdict.
    pub decisions_total: Family<DecisionLabels, Counter>,

    /// Gateway routes, by outcome.
    pub routes_total: Family<RouteLabels, Counter>,

    /// Failed calls to downstream services.
    pub upstream_failures_total: Family<UpstreamFailureLabels, Counter>,

    /// Evidence appends that failed and were suppressed.
    pub evidence_failures_total: Counter,

    /// Records ever appended to the local evidence store.
    pub evidence_records: Gauge,
}

impl PromptGateMetrics {
    /// Create and register all metrics with the given registry.
    pub fn new(registry: &mut Registry) -> Self {
        let decisions_total = Family::<DecisionLabels, Counter>::default();
        registry.register(
            "promptgate_decisions",
            "Policy decisions by verdict",
            decisions_total.clone(),
        );

        let routes_total = Family::<RouteLabels, Counter>::default();
        registry.register(
            "promptgate_routes",
            "Gateway routes by outcome",
            routes_total.clone(),
        );

        let upstream_failures_total = Family::<UpstreamFailureLabels, Counter>::default();
        registry.register(
            "promptgate_upstream_failures",
            "Failed calls to downstream services by origin and kind",
            upstream_failures_total.clone(),
        );

        let evidence_failures_total = Counter::default();
        registry.register(
            "promptgate_evidence_failures",
            "Evidence appends that failed and were suppressed",
            evidence_failures_total.clone(),
        );

        let evidence_records = Gauge::default();
        registry.register(
            "promptgate_evidence_records",
            "Records ever appended to the evidence store",
            evidence_records.clone(),
        );

        Self {
            decisions_total,
            routes_total,
            upstream_failures_total,
            evidence_failures_total,
            evidence_records,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Convenience Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a decision.
    pub fn record_decision(&self, verdict: Verdict) {
        self.decisions_total
            .get_or_create(&DecisionLabels {
                verdict: verdict.as_str().to_string(),
            })
            .inc();
    }

    /// Record a gateway route outcome.
    pub fn record_route(&self, outcome: &str) {
        self.routes_total
            .get_or_create(&RouteLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Record an upstream failure. Non-upstream errors are ignored.
    pub fn record_upstream_failure(&self, error: &PromptGateError) {
        let Some(origin) = error.origin() else {
            return;
        };
        self.upstream_failures_total
            .get_or_create(&UpstreamFailureLabels {
                origin: origin.as_str().to_string(),
                kind: error.error_type_name().to_string(),
            })
            .inc();
    }

    /// Record a suppressed evidence failure.
    pub fn record_evidence_failure(&self) {
        self.evidence_failures_total.inc();
    }

    /// Publish the evidence store's running count.
    pub fn set_evidence_records(&self, count: u64) {
        self.evidence_records
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

/// Encode a registry in OpenMetrics text format.
///
/// # Errors
///
/// Returns [`PromptGateError::Internal`] if encoding fails.
pub fn encode_registry(registry: &Registry) -> Result<String, PromptGateError> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, registry).map_err(|e| {
        PromptGateError::Internal {
            details: format!("metrics encoding failed: {e}"),
        }
    })?;
    Ok(buffer)
}
