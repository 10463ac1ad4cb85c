//! Normalization of remote payloads.
//!
//! The backend answers either with an envelope `{success, message, data}` or
//! with the bare payload. The shape is resolved once here; nothing downstream
//! looks at it again.

use crate::error::{CacheError, Result};
use serde_json::Value;

#[derive(Debug, PartialEq, Clone)]
pub enum ApiResponse {
    Enveloped {
        success: bool,
        message: Option<String>,
        data: Value,
    },
    Bare(Value),
}

impl ApiResponse {
    /// Classifies a raw payload. An object carrying a boolean `success` is an
    /// envelope; anything else is taken as the payload itself.
    pub fn normalize(raw: Value) -> Self {
        match raw {
            Value::Object(mut map) if map.get("success").is_some_and(Value::is_boolean) => {
                let success = map.get("success").and_then(Value::as_bool).unwrap_or(false);
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let data = map.remove("data").unwrap_or(Value::Null);
                Self::Enveloped {
                    success,
                    message,
                    data,
                }
            }
            other => Self::Bare(other),
        }
    }

    /// Unwraps to the payload, turning `success: false` into a rejection.
    pub fn into_data(self) -> Result<Value> {
        match self {
            Self::Enveloped {
                success: false,
                message,
                ..
            } => Err(CacheError::Rejected(
                message.unwrap_or_else(|| "request was not successful".to_string()),
            )),
            Self::Enveloped { data, .. } => Ok(data),
            Self::Bare(data) => Ok(data),
        }
    }
}

/// Normalizes `raw` and returns its payload.
pub fn normalize_data(raw: Value) -> Result<Value> {
    ApiResponse::normalize(raw).into_data()
}

/// Extracts the first created entity from a creation response.
///
/// The payload must be a JSON object or array ("Invalid response format"),
/// and its data must be an array, or an object with an array under `items`
/// ("Invalid response structure").
pub fn first_created(raw: Value) -> Result<Option<Value>> {
    if !(raw.is_object() || raw.is_array()) {
        return Err(CacheError::malformed("Invalid response format"));
    }
    let data = normalize_data(raw)?;
    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => return Err(CacheError::malformed("Invalid response structure")),
        },
        _ => return Err(CacheError::malformed("Invalid response structure")),
    };
    Ok(items.into_iter().next())
}
