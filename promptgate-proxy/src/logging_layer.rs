//! Request tracing for every PromptGate service.
//!
//! Wraps `tower_http::trace::TraceLayer` so that each request gets a span
//! carrying `service` and `request_id` (taken from `x-request-id`, or a fresh
//! UUID). Headers are only formatted at `debug` level and credentials are
//! redacted. Request bodies (prompts) are never logged.

use std::fmt;
use std::time::Duration;

use http::{HeaderMap, Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, MakeSpan, OnFailure, OnRequest, OnResponse, TraceLayer,
};
use tracing::{Span, debug, info, warn};

/// Header carrying the caller's correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "proxy-authorization",
    "x-api-key",
    "x-auth-token",
];

const MAX_HEADERS_TO_LOG: usize = 50;
const MAX_VALUE_LEN: usize = 512;

/// Concrete type of the layer returned by [`logging_layer`].
pub type PromptGateTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestIdMakeSpan,
    OnRequestLogger,
    OnResponseLogger,
    DefaultOnBodyChunk,
    DefaultOnEos,
    OnFailureLogger,
>;

/// Build the tracing layer for `service`.
pub fn logging_layer(service: &'static str) -> PromptGateTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestIdMakeSpan { service })
        .on_request(OnRequestLogger)
        .on_response(OnResponseLogger)
        .on_failure(OnFailureLogger)
}

/// Creates the per-request span.
#[derive(Clone, Debug)]
pub struct RequestIdMakeSpan {
    service: &'static str,
}

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request_id(request.headers());
        tracing::info_span!(
            "request",
            service = self.service,
            method = %request.method(),
            uri = %request.uri().path(),
            request_id = %request_id,
        )
    }
}

/// The caller-supplied request id, or a new UUID.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Logs request arrival.
#[derive(Clone, Debug)]
pub struct OnRequestLogger;

impl<B> OnRequest<B> for OnRequestLogger {
    fn on_request(&mut self, request: &Request<B>, _span: &Span) {
        info!(method = %request.method(), path = %request.uri().path(), "Request received");
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(headers = ?SanitizedHeaders(request.headers()), "Request headers");
        }
    }
}

/// Logs status and latency.
#[derive(Clone, Debug)]
pub struct OnResponseLogger;

impl<B> OnResponse<B> for OnResponseLogger {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        info!(
            status = response.status().as_u16(),
            latency_ms = latency.as_millis(),
            "Response sent"
        );
    }
}

/// Logs 5xx responses and service errors.
#[derive(Clone, Debug)]
pub struct OnFailureLogger;

impl OnFailure<ServerErrorsFailureClass> for OnFailureLogger {
    fn on_failure(&mut self, failure: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
        warn!(
            classification = %failure,
            latency_ms = latency.as_millis(),
            "Request failed"
        );
    }
}

/// Debug view of a header map with credentials masked.
pub struct SanitizedHeaders<'a>(pub &'a HeaderMap);

impl fmt::Debug for SanitizedHeaders<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (idx, (name, value)) in self.0.iter().enumerate() {
            if idx >= MAX_HEADERS_TO_LOG {
                map.entry(&"...", &format!("({} more headers)", self.0.len() - idx));
                break;
            }
            let name = name.as_str();
            if SENSITIVE_HEADERS
                .iter()
                .any(|s| name.eq_ignore_ascii_case(s))
            {
                map.entry(&name, &"[REDACTED]");
                continue;
            }
            match value.to_str() {
                Ok(v) if v.len() <= MAX_VALUE_LEN => {
                    map.entry(&name, &v);
                }
                Ok(v) => {
                    // Header values are visible ASCII, so any index is a char boundary.
                    map.entry(&name, &format!("{}... ({} bytes)", &v[..MAX_VALUE_LEN], v.len()));
                }
                Err(_) => {
                    map.entry(&name, &format!("<binary: {} bytes>", value.len()));
                }
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_request_id_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));
        assert_eq!(request_id(&headers), "req-42");
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let id = request_id(&HeaderMap::new());
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_sensitive_headers_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("x-api-key", HeaderValue::from_static("k"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let rendered = format!("{:?}", SanitizedHeaders(&headers));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("application/json"));
    }

    #[test]
    fn test_long_values_truncated() {
        let mut headers = HeaderMap::new();
        let long = "a".repeat(MAX_VALUE_LEN + 10);
        headers.insert("x-long", HeaderValue::from_str(&long).unwrap());
        let rendered = format!("{:?}", SanitizedHeaders(&headers));
        assert!(rendered.contains(&format!("({} bytes)", MAX_VALUE_LEN + 10)));
    }
}
