//! answer: the reference answer pipeline service.
//!
//! - `POST /v1/answer` `{prompt, labels}` → `{answer, used_context}`
//! - `POST /v1/toolcall` `{prompt}` → `{context}`
//! - `POST /v1/generate` `{prompt, context}` → `{text}`
//!
//! `/v1/answer` composes retrieval and generation in-process. It does not
//! call `/v1/toolcall` and `/v1/generate` over HTTP, and there is no
//! `TOOLS_URL` or `MODELS_URL` to point it at separate tools or models
//! services. The two step endpoints only expose the same functions
//! individually. A deployment that needs a real pipeline replaces this
//! service and points the gateway's `RAG_URL` at it.

use axum::routing::post;
use axum::{Json, Router};
use promptgate_core::answer::{
    AnswerRequest, AnswerResponse, GenerateRequest, ReferenceAnswerPipeline, ToolCallRequest,
    generate, retrieve_context,
};
use serde::Serialize;

use crate::extract::Validated;

/// Service name reported by `/healthz`.
pub const SERVICE_NAME: &str = "answer";

/// `/v1/toolcall` response body.
#[derive(Debug, Serialize)]
pub struct ToolCallResponse {
    /// Retrieved context.
    pub context: String,
}

/// `/v1/generate` response body.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// Generated text.
    pub text: String,
}

/// Routes for the answer service.
pub fn router() -> Router {
    Router::new()
        .route("/v1/answer", post(answer))
        .route("/v1/toolcall", post(toolcall))
        .route("/v1/generate", post(generate_text))
}

async fn answer(Validated(request): Validated<AnswerRequest>) -> Json<AnswerResponse> {
    Json(ReferenceAnswerPipeline.run(&request))
}

async fn toolcall(Validated(request): Validated<ToolCallRequest>) -> Json<ToolCallResponse> {
    Json(ToolCallResponse {
        context: retrieve_context(&request.prompt),
    })
}

async fn generate_text(Validated(request): Validated<GenerateRequest>) -> Json<GenerateResponse> {
    Json(GenerateResponse {
        text: generate(&request.prompt, &request.context),
    })
}
