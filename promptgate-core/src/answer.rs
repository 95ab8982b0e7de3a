//! Answer pipeline contract and the reference implementation.
//!
//! The gateway only knows the contract: a (possibly redacted) prompt and the
//! caller's labels go in, a JSON object (normally with `answer` and
//! `used_context`) comes out. That object is relayed to the client untouched.
//!
//! [`ReferenceAnswerPipeline`] is a deterministic stand-in used for local runs
//! and tests: a context-retrieval step followed by an echoing generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PromptGateError;
use crate::validate::null_as_default;

/// Number of prompt characters quoted in a retrieved context.
const CONTEXT_PREVIEW_CHARS: usize = 32;

/// Request sent to the answer pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// Prompt after redaction.
    pub prompt: String,
    /// Topic tags copied from the query.
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<String>,
}

/// Payload returned by the answer pipeline.
///
/// The only requirement is that it is a JSON object. It is relayed to the
/// client exactly as received: fields are neither added, defaulted nor
/// type-checked. The pipeline contract names `answer` and `used_context`,
/// read through [`AnswerResponse::answer`] and
/// [`AnswerResponse::used_context`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerResponse(Map<String, Value>);

impl AnswerResponse {
    /// A response with just an answer and its context.
    pub fn new(answer: impl Into<String>, used_context: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("answer".to_string(), Value::String(answer.into()));
        fields.insert("used_context".to_string(), Value::String(used_context.into()));
        Self(fields)
    }

    /// Generated text, when present and a string.
    pub fn answer(&self) -> Option<&str> {
        self.0.get("answer").and_then(Value::as_str)
    }

    /// Context the answer was generated from, when present and a string.
    pub fn used_context(&self) -> Option<&str> {
        self.0.get("used_context").and_then(Value::as_str)
    }

    /// All fields, as received.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for AnswerResponse {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Something that can answer a redacted prompt.
#[async_trait]
pub trait AnswerPipeline: Send + Sync {
    /// Produce an answer.
    ///
    /// # Errors
    ///
    /// Returns an upstream error when the pipeline is unavailable.
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, PromptGateError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Reference pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Context-retrieval request (`POST /v1/toolcall`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Prompt to retrieve context for.
    pub prompt: String,
}

/// Generation request (`POST /v1/generate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Prompt to answer.
    pub prompt: String,
    /// Retrieved context, empty when absent or `null`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: String,
}

/// Retrieve the context for a prompt: a marker quoting its first 32 characters.
pub fn retrieve_context(prompt: &str) -> String {
    let preview: String = prompt.chars().take(CONTEXT_PREVIEW_CHARS).collect();
    format!("[ctx for: {preview}...]")
}

/// Generate a reply by echoing the prompt and the context length in characters.
pub fn generate(prompt: &str, context: &str) -> String {
    format!("Echo: {prompt} | ctx bytes: {}", context.chars().count())
}

/// Deterministic in-process answer pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceAnswerPipeline;

impl ReferenceAnswerPipeline {
    /// Run retrieval then generation.
    pub fn run(&self, request: &AnswerRequest) -> AnswerResponse {
        let context = retrieve_context(&request.prompt);
        let text = generate(&request.prompt, &context);
        AnswerResponse::new(text, context)
    }
}

#[async_trait]
impl AnswerPipeline for ReferenceAnswerPipeline {
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, PromptGateError> {
        Ok(self.run(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::from_json;
    use serde_json::json;

    #[test]
    fn test_retrieve_context_truncates_to_32_chars() {
        assert_eq!(retrieve_context("short"), "[ctx for: short...]");
        let long = "a".repeat(40);
        assert_eq!(
            retrieve_context(&long),
            format!("[ctx for: {}...]", "a".repeat(32))
        );
    }

    #[test]
    fn test_retrieve_context_counts_characters_not_bytes() {
        let prompt = "é".repeat(40);
        assert_eq!(
            retrieve_context(&prompt),
            format!("[ctx for: {}...]", "é".repeat(32))
        );
    }

    #[test]
    fn test_generate_echoes_prompt() {
        assert_eq!(generate("hi", "abc"), "Echo: hi | ctx bytes: 3");
        assert_eq!(generate("hi", ""), "Echo: hi | ctx bytes: 0");
    }

    #[tokio::test]
    async fn test_reference_pipeline() {
        let response = ReferenceAnswerPipeline
            .answer(&AnswerRequest {
                prompt: "contact [REDACTED] for help".to_string(),
                labels: vec!["support".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(
            response.used_context(),
            Some("[ctx for: contact [REDACTED] for help...]")
        );
        assert_eq!(
            response.answer(),
            Some("Echo: contact [REDACTED] for help | ctx bytes: 41")
        );
    }

    #[test]
    fn test_response_relayed_as_received() {
        let body = json!({"answer": null, "used_context": "c", "model": "echo-1"});
        let response: AnswerResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(response.answer(), None);
        assert_eq!(response.fields().get("model"), Some(&json!("echo-1")));
        assert_eq!(serde_json::to_value(&response).unwrap(), body);
    }

    #[test]
    fn test_response_missing_context_not_filled_in() {
        let body = json!({"answer": "a"});
        let response: AnswerResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(response.used_context(), None);
        assert_eq!(serde_json::to_value(&response).unwrap(), body);
    }

    #[test]
    fn test_response_null_context_accepted() {
        let body = json!({"answer": "a", "used_context": null});
        let response: AnswerResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(serde_json::to_value(&response).unwrap(), body);
    }

    #[test]
    fn test_response_must_be_an_object() {
        assert!(serde_json::from_value::<AnswerResponse>(json!("text")).is_err());
        assert!(serde_json::from_value::<AnswerResponse>(json!(["a"])).is_err());
        assert!(serde_json::from_value::<AnswerResponse>(json!({"answer": 3})).is_ok());
    }

    #[test]
    fn test_request_parsing() {
        let req: AnswerRequest = from_json(&json!({"prompt": "p", "labels": null})).unwrap();
        assert!(req.labels.is_empty());

        let req: GenerateRequest = from_json(&json!({"prompt": "p", "context": null})).unwrap();
        assert_eq!(req.context, "");

        match from_json::<ToolCallRequest>(&json!({})) {
            Err(PromptGateError::InvalidInput { field, .. }) => assert_eq!(field, "prompt"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }
}
