//! HTTP-backed implementations of the pipeline seams.
//!
//! Each type wraps a [`ServiceClient`] and speaks one service's JSON contract:
//!
//! | Type | Endpoint | Origin |
//! |------|----------|--------|
//! | [`RemoteDecider::pdp`] | `POST /v1/pdp/decide` | PDP |
//! | [`RemoteDecider::pep`] | `POST /v1/decide` | PEP |
//! | [`RemoteAnswerPipeline`] | `POST /v1/answer` | Answer pipeline |
//! | [`RemoteEvidenceSink`] | `POST /v1/evidence` | Evidence store |

use async_trait::async_trait;
use serde::Deserialize;

use crate::answer::{AnswerPipeline, AnswerRequest, AnswerResponse};
use crate::enforcement::PolicyDecider;
use crate::error::{Origin, PromptGateError};
use crate::evidence::{EvidenceRecord, EvidenceSink};
use crate::policy::{Decision, Query};

use super::ServiceClient;

/// PDP decision endpoint.
pub const PDP_DECIDE_PATH: &str = "/v1/pdp/decide";
/// PEP decision endpoint.
pub const PEP_DECIDE_PATH: &str = "/v1/decide";
/// Answer pipeline endpoint.
pub const ANSWER_PATH: &str = "/v1/answer";
/// Evidence endpoint.
pub const EVIDENCE_PATH: &str = "/v1/evidence";

/// Decision source reached over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteDecider {
    client: ServiceClient,
    path: &'static str,
}

impl RemoteDecider {
    /// Talk to a PDP. The client's origin should be [`Origin::Pdp`].
    pub fn pdp(client: ServiceClient) -> Self {
        Self {
            client,
            path: PDP_DECIDE_PATH,
        }
    }

    /// Talk to a PEP. The client's origin should be [`Origin::Pep`].
    pub fn pep(client: ServiceClient) -> Self {
        Self {
            client,
            path: PEP_DECIDE_PATH,
        }
    }
}

#[async_trait]
impl PolicyDecider for RemoteDecider {
    async fn decide(&self, query: &Query) -> Result<Decision, PromptGateError> {
        let decision: Decision = self.client.post_json(self.path, query).await?;
        decision
            .validate()
            .map_err(|details| PromptGateError::UpstreamInvalidResponse {
                origin: self.client.origin(),
                details,
            })?;
        Ok(decision)
    }
}

/// Answer pipeline reached over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteAnswerPipeline {
    client: ServiceClient,
}

impl RemoteAnswerPipeline {
    /// Wrap a client whose origin is [`Origin::AnswerPipeline`].
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnswerPipeline for RemoteAnswerPipeline {
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, PromptGateError> {
        self.client.post_json(ANSWER_PATH, request).await
    }
}

/// Acknowledgement returned by `POST /v1/evidence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EvidenceAck {
    /// Always `true` on success.
    pub ok: bool,
    /// Records ever appended, including this one.
    pub count: u64,
}

/// Evidence store reached over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteEvidenceSink {
    client: ServiceClient,
}

impl RemoteEvidenceSink {
    /// Wrap a client whose origin is [`Origin::EvidenceStore`].
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EvidenceSink for RemoteEvidenceSink {
    async fn append(&self, record: EvidenceRecord) -> Result<u64, PromptGateError> {
        let ack: EvidenceAck = self.client.post_json(EVIDENCE_PATH, &record).await?;
        if !ack.ok {
            return Err(PromptGateError::UpstreamInvalidResponse {
                origin: self.client.origin(),
                details: "evidence store did not acknowledge the record".to_string(),
            });
        }
        Ok(ack.count)
    }
}
