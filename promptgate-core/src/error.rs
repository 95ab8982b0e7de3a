//! Error handling for PromptGate.
//!
//! Every failure that can cross a component boundary is a [`PromptGateError`].
//! The variants fall into three families:
//!
//! - **Validation**: malformed input, rejected before any policy evaluation.
//! - **Upstream unavailable**: a downstream service (PDP, PEP, answer pipeline,
//!   evidence store) was unreachable, timed out, answered with a non-success
//!   status, or returned a body that does not honour its contract.
//! - **Operational**: configuration and internal errors.
//!
//! A policy denial is deliberately *not* an error. It is a normal
//! [`Decision`](crate::policy::Decision) and travels on the success path.

use std::fmt;

use thiserror::Error;

/// The downstream component a request was waiting on when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Policy Decision Point (rule evaluation).
    Pdp,
    /// Policy Enforcement Point (delegating proxy in front of the PDP).
    Pep,
    /// Answer pipeline (context retrieval + generation).
    AnswerPipeline,
    /// Evidence store.
    EvidenceStore,
}

impl Origin {
    /// Stable lowercase identifier, used for metric labels and JSON bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdp => "pdp",
            Self::Pep => "pep",
            Self::AnswerPipeline => "answer_pipeline",
            Self::EvidenceStore => "evidence_store",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdp => write!(f, "PDP"),
            Self::Pep => write!(f, "PEP"),
            Self::AnswerPipeline => write!(f, "Answer pipeline"),
            Self::EvidenceStore => write!(f, "Evidence store"),
        }
    }
}

/// All error types that can occur in PromptGate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PromptGateError {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────
    /// A request field is missing or has the wrong type.
    #[error("Invalid field '{field}': {details}")]
    InvalidInput {
        /// Name of the offending field (`body` when the payload itself is bad)
        field: String,
        /// What was wrong with it
        details: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Upstream unavailable
    // ─────────────────────────────────────────────────────────────────────────
    /// Could not connect to the downstream service.
    #[error("{origin} unavailable: connection to {url} failed: {reason}")]
    UpstreamConnectionFailed {
        /// Which component failed
        origin: Origin,
        /// The URL that was being called
        url: String,
        /// Transport-level reason
        reason: String,
    },

    /// The downstream service did not answer within the stage timeout.
    #[error("{origin} unavailable: no response within {timeout_ms}ms")]
    UpstreamTimeout {
        /// Which component timed out
        origin: Origin,
        /// The stage timeout that elapsed
        timeout_ms: u64,
    },

    /// The downstream service answered with a non-success HTTP status.
    #[error("{origin} unavailable: upstream returned HTTP {status}")]
    UpstreamStatus {
        /// Which component failed
        origin: Origin,
        /// The HTTP status code received
        status: u16,
    },

    /// The downstream service answered, but the body broke its contract.
    #[error("{origin} unavailable: invalid response: {details}")]
    UpstreamInvalidResponse {
        /// Which component failed
        origin: Origin,
        /// What was wrong with the body
        details: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Operational
    // ─────────────────────────────────────────────────────────────────────────
    /// Startup configuration is unusable.
    #[error("Configuration error: {details}")]
    Config {
        /// Description of the problem
        details: String,
    },

    /// Internal error - should not happen.
    #[error("Internal error: {details}")]
    Internal {
        /// Description of the problem
        details: String,
    },
}

impl PromptGateError {
    /// Returns `true` for every variant that means "a downstream dependency
    /// could not be used", as opposed to a policy outcome or bad input.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamConnectionFailed { .. }
                | Self::UpstreamTimeout { .. }
                | Self::UpstreamStatus { .. }
                | Self::UpstreamInvalidResponse { .. }
        )
    }

    /// The downstream component that failed, for upstream errors.
    pub fn origin(&self) -> Option<Origin> {
        match self {
            Self::UpstreamConnectionFailed { origin, .. }
            | Self::UpstreamTimeout { origin, .. }
            | Self::UpstreamStatus { origin, .. }
            | Self::UpstreamInvalidResponse { origin, .. } => Some(*origin),
            _ => None,
        }
    }

    /// Returns the error type name for metrics and logging.
    pub fn error_type_name(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "validation_error",
            Self::UpstreamConnectionFailed { .. } => "upstream_connection_failed",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::UpstreamInvalidResponse { .. } => "upstream_invalid_response",
            Self::Config { .. } => "config_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Re-attribute an upstream error to a different origin.
    ///
    /// The PEP uses this so that, seen from the gateway, a dead PDP behind a
    /// live PEP still reads as a PEP failure. The cause is kept intact.
    #[must_use]
    pub fn with_origin(self, new_origin: Origin) -> Self {
        match self {
            Self::UpstreamConnectionFailed { url, reason, .. } => Self::UpstreamConnectionFailed {
                origin: new_origin,
                url,
                reason,
            },
            Self::UpstreamTimeout { timeout_ms, .. } => Self::UpstreamTimeout {
                origin: new_origin,
                timeout_ms,
            },
            Self::UpstreamStatus { status, .. } => Self::UpstreamStatus {
                origin: new_origin,
                status,
            },
            Self::UpstreamInvalidResponse { details, .. } => Self::UpstreamInvalidResponse {
                origin: new_origin,
                details,
            },
            other => other,
        }
    }
}
