//! Request body validation.
//!
//! [`Validated<T>`] reads the body as JSON and decodes `T` through
//! [`promptgate_core::validate::from_json`], so every rejection is a 422 that
//! names the offending field. Bodies that are not JSON at all (wrong content
//! type, syntax error) are reported against the `body` field.

use axum::Json;
use axum::extract::{FromRequest, Request};
use promptgate_core::PromptGateError;
use promptgate_core::validate::{BODY_FIELD, from_json};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Extractor for a validated JSON body.
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError(PromptGateError::InvalidInput {
                    field: BODY_FIELD.to_string(),
                    details: rejection.body_text(),
                })
            })?;
        from_json(&value).map(Validated).map_err(ApiError)
    }
}
