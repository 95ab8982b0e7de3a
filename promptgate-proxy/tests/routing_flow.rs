//! End-to-end routing over real HTTP.
//!
//! Topology: gateway → pep → aims, gateway → spy answer pipeline, and
//! gateway → aims for evidence. Every service runs on an ephemeral port.

mod helpers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use helpers::*;
use promptgate_core::config::ServiceConfig;
use promptgate_core::gateway::Gateway;
use promptgate_proxy::{ServiceKind, build_app};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct Stack {
    aims: SocketAddr,
    gateway: SocketAddr,
    orchestrator: Arc<Gateway>,
    answer: MockAnswer,
    client: reqwest::Client,
}

impl Stack {
    /// Full stack with healthy peers.
    async fn start() -> Self {
        let aims = spawn_service(ServiceKind::Aims, None).await;
        let pep = spawn_service(ServiceKind::Pep, Some(aims)).await;
        Self::with_peers(aims, pep, aims).await
    }

    /// Gateway wired to the given PEP and evidence store addresses.
    async fn with_peers(aims: SocketAddr, pep: SocketAddr, evidence: SocketAddr) -> Self {
        Self::with_answer(aims, pep, evidence, MockAnswer::start_default().await).await
    }

    /// Full stack with healthy peers and a slow answer pipeline.
    async fn with_slow_answer(delay: Duration) -> Self {
        let aims = spawn_service(ServiceKind::Aims, None).await;
        let pep = spawn_service(ServiceKind::Pep, Some(aims)).await;
        let answer = MockAnswer::start_with_delay(default_reply(), delay).await;
        Self::with_answer(aims, pep, aims, answer).await
    }

    async fn with_answer(
        aims: SocketAddr,
        pep: SocketAddr,
        evidence: SocketAddr,
        answer: MockAnswer,
    ) -> Self {
        let config = config_with_peers(aims, pep, answer.addr, evidence);
        let app = build_app(ServiceKind::Gateway, &config).unwrap();
        let orchestrator = app.gateway.clone().unwrap();
        let gateway = spawn_app(app.router).await;
        Self {
            aims,
            gateway,
            orchestrator,
            answer,
            client: reqwest::Client::new(),
        }
    }

    async fn route(&self, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}/v1/route", url(self.gateway)))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn evidence(&self) -> Vec<Value> {
        let body: Value = self
            .client
            .get(format!("{}/v1/evidence", url(self.aims)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["items"].as_array().cloned().unwrap_or_default()
    }
}

/// Start `kind`, pointing its PDP client at `pdp` when given.
async fn spawn_service(kind: ServiceKind, pdp: Option<SocketAddr>) -> SocketAddr {
    let mut config = ServiceConfig::default();
    if let Some(pdp) = pdp {
        config.pdp_url = url(pdp);
    }
    let app = build_app(kind, &config).unwrap();
    spawn_app(app.router).await
}

#[tokio::test]
async fn test_denied_prompt_never_reaches_answer_pipeline() {
    let stack = Stack::start().await;

    let (status, body) = stack
        .route(json!({"prompt": "What is my password?", "sensitivity": "confidential"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"allowed": false, "reason": "Found 'password'"}));
    assert_eq!(stack.answer.request_count().await, 0);

    stack.orchestrator.flush().await;
    assert!(stack.evidence().await.is_empty());
}

#[tokio::test]
async fn test_masked_prompt_is_redacted_and_logged() {
    let stack = Stack::start().await;

    let (status, body) = stack
        .route(json!({"prompt": "contact email@ for help", "labels": ["support"]}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "allowed": true,
            "result": {"answer": "mock answer", "used_context": "mock ctx", "trace_id": "t-1"}
        })
    );
    assert_eq!(stack.answer.request_count().await, 1);
    assert_eq!(
        stack.answer.last_request().await.unwrap(),
        json!({"prompt": "contact [REDACTED] for help", "labels": ["support"]})
    );

    stack.orchestrator.flush().await;
    assert_eq!(
        stack.evidence().await,
        vec![json!({"kind": "gateway_log", "decision": "modify"})]
    );
}

#[tokio::test]
async fn test_clean_prompt_passes_unchanged() {
    let stack = Stack::start().await;

    let (status, body) = stack
        .route(json!({"prompt": "hello there", "sensitivity": "restricted"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert_eq!(
        stack.answer.last_request().await.unwrap()["prompt"],
        "hello there"
    );

    stack.orchestrator.flush().await;
    assert_eq!(
        stack.evidence().await,
        vec![json!({"kind": "gateway_log", "decision": "allow"})]
    );
}

#[tokio::test]
async fn test_unreachable_pep_is_502_without_answer_call() {
    let aims = spawn_service(ServiceKind::Aims, None).await;
    let stack = Stack::with_peers(aims, closed_addr().await, aims).await;

    let (status, body) = stack.route(json!({"prompt": "hello"})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["origin"], "pep");
    assert_eq!(body["error_type"], "upstream_connection_failed");
    assert!(body.get("allowed").is_none());
    assert_eq!(stack.answer.request_count().await, 0);

    stack.orchestrator.flush().await;
    assert!(stack.evidence().await.is_empty());
}

#[tokio::test]
async fn test_pep_with_unreachable_pdp_is_502() {
    let pep = spawn_service(ServiceKind::Pep, Some(closed_addr().await)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/v1/decide", url(pep)))
        .json(&json!({"prompt": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["origin"], "pdp");
}

#[tokio::test]
async fn test_evidence_outage_does_not_affect_response() {
    let aims = spawn_service(ServiceKind::Aims, None).await;
    let pep = spawn_service(ServiceKind::Pep, Some(aims)).await;
    let stack = Stack::with_peers(aims, pep, closed_addr().await).await;

    let (status, body) = stack.route(json!({"prompt": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert_eq!(body["result"]["answer"], "mock answer");

    stack.orchestrator.flush().await;
    assert_eq!(stack.orchestrator.evidence_failures(), 1);
    assert!(stack.evidence().await.is_empty());
}

#[tokio::test]
async fn test_client_disconnect_still_records_evidence() {
    let stack = Stack::with_slow_answer(Duration::from_millis(800)).await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let result = impatient
        .post(format!("{}/v1/route", url(stack.gateway)))
        .json(&json!({"prompt": "hello"}))
        .send()
        .await;
    assert!(result.unwrap_err().is_timeout());

    stack.orchestrator.flush().await;
    assert_eq!(stack.answer.request_count().await, 1);
    assert_eq!(
        stack.evidence().await,
        vec![json!({"kind": "gateway_log", "decision": "allow"})]
    );
}

#[tokio::test]
async fn test_invalid_body_is_422() {
    let stack = Stack::start().await;

    let (status, body) = stack.route(json!({"sensitivity": "restricted"})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_type"], "validation_error");
    assert_eq!(stack.answer.request_count().await, 0);
}

#[tokio::test]
async fn test_every_service_reports_health() {
    let stack = Stack::start().await;

    let body: Value = stack
        .client
        .get(format!("{}/healthz", url(stack.gateway)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"status": "ok", "service": "gateway", "version": "test"}));

    let body: Value = stack
        .client
        .get(format!("{}/healthz", url(stack.aims)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["service"], "aims");
}

#[tokio::test]
async fn test_gateway_metrics_count_routes() {
    let stack = Stack::start().await;
    stack.route(json!({"prompt": "hello"})).await;
    stack
        .route(json!({"prompt": "password", "sensitivity": "restricted"}))
        .await;

    let text = stack
        .client
        .get(format!("{}/metrics", url(stack.gateway)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("promptgate_routes_total{outcome=\"allowed\"} 1"));
    assert!(text.contains("promptgate_routes_total{outcome=\"denied\"} 1"));
}
