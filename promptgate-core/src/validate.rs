//! Decoding of untrusted JSON bodies.
//!
//! Every inbound payload is a plain serde type. [`from_json`] runs its
//! `Deserialize` impl through `serde_path_to_error`, so a rejection names the
//! offending field (`prompt`, `labels[1]`) instead of just failing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::PromptGateError;

/// Field name reported when the payload as a whole is unusable.
pub const BODY_FIELD: &str = "body";

/// Decode `value` into `T`, naming the offending field on failure.
///
/// The body must be a JSON object. Unknown fields are ignored.
///
/// # Errors
///
/// Returns [`PromptGateError::InvalidInput`] when the body is not an object,
/// a required field is missing, or a field has the wrong type.
pub fn from_json<T: DeserializeOwned>(value: &Value) -> Result<T, PromptGateError> {
    if !value.is_object() {
        return Err(PromptGateError::InvalidInput {
            field: BODY_FIELD.to_string(),
            details: "expected a JSON object".to_string(),
        });
    }

    serde_path_to_error::deserialize(value).map_err(|e| {
        let path = e.path().to_string();
        let details = e.into_inner().to_string();
        let field = if path == "." {
            missing_field(&details).unwrap_or(BODY_FIELD).to_string()
        } else {
            path
        };
        PromptGateError::InvalidInput { field, details }
    })
}

/// Missing fields are reported at the root; recover the name from serde's
/// "missing field `name`" message.
fn missing_field(details: &str) -> Option<&str> {
    details
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
}

/// Treat an explicit `null` like an absent field.
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
