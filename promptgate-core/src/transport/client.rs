//! JSON-over-HTTP client for PromptGate services.
//!
//! One [`ServiceClient`] per downstream service. The client keeps a pooled
//! reqwest connection set and classifies every failure into an upstream
//! [`PromptGateError`] carrying the service's [`Origin`]:
//!
//! - Timeout → `UpstreamTimeout`
//! - Connection refused / DNS → `UpstreamConnectionFailed`
//! - Non-2xx status → `UpstreamStatus`
//! - Unreadable or unexpected body → `UpstreamInvalidResponse`
//!
//! Requests are never retried.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::validate_base_url;
use crate::error::{Origin, PromptGateError};

/// HTTP client bound to one downstream service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    origin: Origin,
    base_url: String,
    timeout: Duration,
}

impl ServiceClient {
    /// Create a client for the service at `base_url`.
    ///
    /// `timeout` bounds the whole exchange, `connect_timeout` the TCP/TLS
    /// handshake.
    ///
    /// # Errors
    ///
    /// Returns [`PromptGateError::Config`] for an invalid base URL and
    /// [`PromptGateError::Internal`] if the HTTP client cannot be built.
    pub fn new(
        origin: Origin,
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, PromptGateError> {
        let base_url = validate_base_url(origin.as_str(), base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| PromptGateError::Internal {
                details: format!("http client build error: {e}"),
            })?;

        Ok(Self {
            client,
            origin,
            base_url,
            timeout,
        })
    }

    /// The component this client talks to.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `body` as JSON to `path` and decode the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns an upstream error tagged with this client's origin.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, PromptGateError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(origin = self.origin.as_str(), url = %url, "Calling downstream service");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify_error(e, &url))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                origin = self.origin.as_str(),
                url = %url,
                status = status.as_u16(),
                "Downstream service returned an error status"
            );
            return Err(PromptGateError::UpstreamStatus {
                origin: self.origin,
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify_error(e, &url))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(
                origin = self.origin.as_str(),
                url = %url,
                error = %e,
                "Downstream service returned an unexpected body"
            );
            PromptGateError::UpstreamInvalidResponse {
                origin: self.origin,
                details: e.to_string(),
            }
        })
    }

    fn classify_error(&self, error: reqwest::Error, url: &str) -> PromptGateError {
        if error.is_timeout() {
            warn!(
                origin = self.origin.as_str(),
                url = %url,
                timeout_ms = duration_ms(self.timeout),
                "Downstream request timed out"
            );
            PromptGateError::UpstreamTimeout {
                origin: self.origin,
                timeout_ms: duration_ms(self.timeout),
            }
        } else if error.is_connect() {
            warn!(
                origin = self.origin.as_str(),
                url = %url,
                "Failed to connect to downstream service"
            );
            PromptGateError::UpstreamConnectionFailed {
                origin: self.origin,
                url: url.to_string(),
                reason: error.to_string(),
            }
        } else {
            warn!(
                origin = self.origin.as_str(),
                url = %url,
                error = %error,
                "Downstream request failed"
            );
            PromptGateError::UpstreamConnectionFailed {
                origin: self.origin,
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

/// Milliseconds in a duration, saturating.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
