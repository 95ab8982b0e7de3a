//! Service assembly.
//!
//! One binary hosts four services; the subcommand picks which one. Each gets
//! its own metrics registry, `/healthz` + `/metrics`, and the request tracing
//! layer.

pub mod aims;
pub mod answer;
pub mod gateway;
pub mod pep;

use std::fmt;
use std::sync::Arc;

use axum::Router;
use clap::Subcommand;
use prometheus_client::registry::Registry;
use promptgate_core::config::ServiceConfig;
use promptgate_core::enforcement::EnforcementPoint;
use promptgate_core::evidence::EvidenceStore;
use promptgate_core::gateway::{Gateway, StageTimeouts};
use promptgate_core::policy::PolicyDecisionPoint;
use promptgate_core::policy::loader::load_rules;
use promptgate_core::telemetry::PromptGateMetrics;
use promptgate_core::transport::{
    RemoteAnswerPipeline, RemoteDecider, RemoteEvidenceSink, ServiceClient,
};
use promptgate_core::{Origin, PromptGateError};
use tracing::info;

use crate::health::{HealthState, health_router};
use crate::logging_layer::logging_layer;

/// Which service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ServiceKind {
    /// Policy Decision Point and evidence store.
    Aims,
    /// Policy Enforcement Point in front of aims.
    Pep,
    /// Policy-gated routing to the answer pipeline.
    Gateway,
    /// Reference answer pipeline.
    Answer,
}

impl ServiceKind {
    /// Name reported by `/healthz` and attached to every request span.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aims => aims::SERVICE_NAME,
            Self::Pep => pep::SERVICE_NAME,
            Self::Gateway => gateway::SERVICE_NAME,
            Self::Answer => answer::SERVICE_NAME,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully wired service, ready to serve.
pub struct App {
    /// Service routes plus health and metrics.
    pub router: Router,
    /// The orchestrator, when this is the gateway. Needed for the evidence
    /// drain on shutdown.
    pub gateway: Option<Arc<Gateway>>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("gateway", &self.gateway.is_some())
            .finish_non_exhaustive()
    }
}

/// Build `kind` from `config`.
///
/// # Errors
///
/// Returns [`PromptGateError::Config`] if the rules cannot be loaded or a
/// peer URL is invalid.
pub fn build_app(kind: ServiceKind, config: &ServiceConfig) -> Result<App, PromptGateError> {
    let mut registry = Registry::default();
    let metrics = Arc::new(PromptGateMetrics::new(&mut registry));
    let timeouts = &config.timeouts;

    let (routes, gateway) = match kind {
        ServiceKind::Aims => {
            let (rules, source) = load_rules().map_err(|e| PromptGateError::Config {
                details: e.to_string(),
            })?;
            info!(source = ?source, "Policy rules ready");
            let state = aims::AimsState {
                pdp: PolicyDecisionPoint::new(rules),
                evidence: Arc::new(EvidenceStore::new()),
                metrics,
            };
            (aims::router(state), None)
        }
        ServiceKind::Pep => {
            let client = ServiceClient::new(
                Origin::Pdp,
                &config.pdp_url,
                timeouts.pdp,
                timeouts.connect,
            )?;
            let state = pep::PepState {
                pep: EnforcementPoint::new(Arc::new(RemoteDecider::pdp(client))),
                metrics,
            };
            (pep::router(state), None)
        }
        ServiceKind::Gateway => {
            let pep_client =
                ServiceClient::new(Origin::Pep, &config.pep_url, timeouts.pep, timeouts.connect)?;
            let answer_client = ServiceClient::new(
                Origin::AnswerPipeline,
                &config.rag_url,
                timeouts.answer,
                timeouts.connect,
            )?;
            let evidence_client = ServiceClient::new(
                Origin::EvidenceStore,
                &config.aims_url,
                timeouts.evidence,
                timeouts.connect,
            )?;
            let gateway = Arc::new(
                Gateway::new(
                    Arc::new(RemoteDecider::pep(pep_client)),
                    Arc::new(RemoteAnswerPipeline::new(answer_client)),
                    Arc::new(RemoteEvidenceSink::new(evidence_client)),
                    StageTimeouts::from(timeouts),
                )
                .with_metrics(metrics),
            );
            let state = gateway::GatewayState {
                gateway: gateway.clone(),
            };
            (gateway::router(state), Some(gateway))
        }
        ServiceKind::Answer => (answer::router(), None),
    };

    let health = health_router(HealthState {
        service: kind.name(),
        version: config.version.clone(),
        registry: Arc::new(registry),
    });

    Ok(App {
        router: routes.merge(health).layer(logging_layer(kind.name())),
        gateway,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(ServiceKind::Aims.name(), "aims");
        assert_eq!(ServiceKind::Pep.name(), "pep");
        assert_eq!(ServiceKind::Gateway.name(), "gateway");
        assert_eq!(ServiceKind::Answer.to_string(), "answer");
    }

    #[test]
    fn test_gateway_app_exposes_orchestrator() {
        let app = build_app(ServiceKind::Gateway, &ServiceConfig::default()).unwrap();
        assert!(app.gateway.is_some());
        assert_eq!(
            app.gateway.unwrap().timeouts(),
            StageTimeouts::from(&ServiceConfig::default().timeouts)
        );
    }

    #[test]
    fn test_invalid_peer_url_is_config_error() {
        let config = ServiceConfig {
            pep_url: "not a url".to_string(),
            ..ServiceConfig::default()
        };
        let err = build_app(ServiceKind::Gateway, &config).unwrap_err();
        assert_eq!(err.error_type_name(), "config_error");
    }

    #[test]
    fn test_answer_app_has_no_orchestrator() {
        let app = build_app(ServiceKind::Answer, &ServiceConfig::default()).unwrap();
        assert!(app.gateway.is_none());
    }
}
