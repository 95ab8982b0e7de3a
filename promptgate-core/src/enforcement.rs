//! Policy Enforcement Point.
//!
//! The PEP sits between the gateway and the PDP. Today it forwards every
//! query unchanged and relays the decision verbatim; it owns one rule of its
//! own: a PDP failure surfaces as a PEP failure, never as a verdict.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{Origin, PromptGateError};
use crate::policy::{Decision, PolicyDecisionPoint, Query};

/// Anything that can turn a [`Query`] into a [`Decision`].
///
/// Implemented by the in-process [`PolicyDecisionPoint`], by
/// [`EnforcementPoint`], and by the HTTP client for a remote PDP/PEP
/// ([`RemoteDecider`](crate::transport::RemoteDecider)). Tests substitute
/// their own implementations.
#[async_trait]
pub trait PolicyDecider: Send + Sync {
    /// Evaluate a query.
    ///
    /// # Errors
    ///
    /// Returns an upstream error when the decision could not be obtained.
    async fn decide(&self, query: &Query) -> Result<Decision, PromptGateError>;
}

#[async_trait]
impl PolicyDecider for PolicyDecisionPoint {
    async fn decide(&self, query: &Query) -> Result<Decision, PromptGateError> {
        Ok(PolicyDecisionPoint::decide(self, query))
    }
}

/// Delegating enforcement point in front of a PDP.
#[derive(Clone)]
pub struct EnforcementPoint {
    pdp: Arc<dyn PolicyDecider>,
}

impl EnforcementPoint {
    /// Wrap a PDP.
    pub fn new(pdp: Arc<dyn PolicyDecider>) -> Self {
        Self { pdp }
    }

    /// Forward the query to the PDP and relay its decision.
    ///
    /// # Errors
    ///
    /// Any PDP failure is returned with its origin left as reported by the
    /// PDP client (normally [`Origin::Pdp`]). Callers one hop further out see
    /// it re-attributed through [`PromptGateError::with_origin`].
    #[tracing::instrument(skip_all)]
    pub async fn enforce(&self, query: &Query) -> Result<Decision, PromptGateError> {
        self.pdp.decide(query).await.inspect_err(|e| {
            warn!(
                error = %e,
                error_type = e.error_type_name(),
                "PDP consultation failed"
            );
        })
    }
}

impl std::fmt::Debug for EnforcementPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnforcementPoint").finish_non_exhaustive()
    }
}

#[async_trait]
impl PolicyDecider for EnforcementPoint {
    /// Used when the gateway embeds the PEP in-process: from its point of view
    /// every failure behind the PEP is a PEP failure.
    async fn decide(&self, query: &Query) -> Result<Decision, PromptGateError> {
        self.enforce(query)
            .await
            .map_err(|e| e.with_origin(Origin::Pep))
    }
}
