//! HTTP error mapping for the PromptGate services.
//!
//! | Error | Status |
//! |-------|--------|
//! | `InvalidInput` | 422 Unprocessable Entity |
//! | any upstream variant | 502 Bad Gateway |
//! | `Config` / `Internal` | 500 Internal Server Error |
//!
//! Body: `{"detail": "...", "error_type": "...", "origin": "..."}`, with
//! `origin` present only for upstream errors. A policy denial never goes
//! through here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use promptgate_core::PromptGateError;
use serde::Serialize;
use tracing::{error, warn};

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub PromptGateError);

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message naming the origin and cause.
    pub detail: String,
    /// Stable error classification.
    pub error_type: &'static str,
    /// Failed component, for upstream errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<&'static str>,
}

impl ApiError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PromptGateError::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            e if e.is_upstream_unavailable() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        ErrorBody {
            detail: self.0.to_string(),
            error_type: self.0.error_type_name(),
            origin: self.0.origin().map(|o| o.as_str()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            if status == StatusCode::BAD_GATEWAY {
                warn!(
                    error = %self.0,
                    error_type = self.0.error_type_name(),
                    "Upstream unavailable"
                );
            } else {
                error!(
                    error = %self.0,
                    error_type = self.0.error_type_name(),
                    "Request failed"
                );
            }
        }
        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use promptgate_core::Origin;
    use serde_json::{Value, json};

    async fn render(err: PromptGateError) -> (StatusCode, Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_validation_is_422() {
        let (status, body) = render(PromptGateError::InvalidInput {
            field: "prompt".to_string(),
            details: "field required".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({
                "detail": "Invalid field 'prompt': field required",
                "error_type": "validation_error"
            })
        );
    }

    #[tokio::test]
    async fn test_upstream_is_502_with_origin() {
        let (status, body) = render(PromptGateError::UpstreamTimeout {
            origin: Origin::Pep,
            timeout_ms: 10_000,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["origin"], "pep");
        assert_eq!(body["error_type"], "upstream_timeout");
        assert_eq!(body["detail"], "PEP unavailable: no response within 10000ms");
    }

    #[tokio::test]
    async fn test_internal_is_500() {
        let (status, body) = render(PromptGateError::Internal {
            details: "boom".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("origin").is_none());
    }
}
