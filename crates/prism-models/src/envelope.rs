//! Response envelope decoding.
//!
//! Business endpoints answer with `{ "success": bool, "data": T,
//! "message"?: string }`; a few legacy list endpoints return a bare `T`.
//! [`ApiResult`] is the tagged form both shapes are decoded into at the
//! boundary, so callers never inspect an untyped payload.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ModelError;

/// Message used when an envelope reports failure without saying why.
pub const DEFAULT_FAILURE_MESSAGE: &str = "request was not successful";

// ---------------------------------------------------------------------------
// ApiResult
// ---------------------------------------------------------------------------

/// Decoded outcome of a business endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    /// The server reported success and returned `data`.
    Ok {
        /// The decoded payload.
        data: T,
        /// Optional human-readable message accompanying the payload.
        message: Option<String>,
    },
    /// The server reported `success: false`.
    Failed {
        /// Human-readable reason.
        message: String,
    },
}

impl<T: DeserializeOwned> ApiResult<T> {
    /// Decode a response body, accepting both the enveloped and bare shapes.
    pub fn from_slice(body: &[u8]) -> Result<Self, ModelError> {
        match serde_json::from_slice::<Payload<T>>(body)? {
            Payload::Enveloped(raw) => raw.into_result(),
            Payload::Bare(data) => Ok(ApiResult::Ok {
                data,
                message: None,
            }),
        }
    }
}

impl<T> ApiResult<T> {
    /// Whether the server reported success.
    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResult::Ok { .. })
    }

    /// The message carried by either variant, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiResult::Ok { message, .. } => message.as_deref(),
            ApiResult::Failed { message } => Some(message),
        }
    }

    /// Convert into a standard `Result`, keeping only the data or the reason.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            ApiResult::Ok { data, .. } => Ok(data),
            ApiResult::Failed { message } => Err(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw wire shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Enveloped(RawEnvelope<T>),
    Bare(T),
}

#[derive(Deserialize)]
struct RawEnvelope<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

impl<T> RawEnvelope<T> {
    fn into_result(self) -> Result<ApiResult<T>, ModelError> {
        if !self.success {
            return Ok(ApiResult::Failed {
                message: self
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            });
        }
        match self.data {
            Some(data) => Ok(ApiResult::Ok {
                data,
                message: self.message,
            }),
            None => Err(ModelError::MissingField {
                field: "data".into(),
            }),
        }
    }
}

/// Extract the optional top-level `message` string from any JSON body.
///
/// Returns `None` for non-JSON bodies, non-object documents and empty
/// messages.
///
/// # Examples
///
/// ```
/// use prism_models::extract_message;
///
/// assert_eq!(extract_message(br#"{"message":"saved"}"#).as_deref(), Some("saved"));
/// assert_eq!(extract_message(b"plain text"), None);
/// ```
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")?
        .as_str()
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn enveloped_success() {
        let r = ApiResult::<Item>::from_slice(br#"{"success":true,"data":{"id":7},"message":"ok"}"#)
            .unwrap();
        assert_eq!(
            r,
            ApiResult::Ok {
                data: Item { id: 7 },
                message: Some("ok".into())
            }
        );
    }

    #[test]
    fn enveloped_failure_keeps_message() {
        let r = ApiResult::<Item>::from_slice(br#"{"success":false,"message":"nope"}"#).unwrap();
        assert_eq!(r.message(), Some("nope"));
        assert!(!r.is_ok());
    }

    #[test]
    fn enveloped_failure_without_message_gets_default() {
        let r = ApiResult::<Item>::from_slice(br#"{"success":false}"#).unwrap();
        assert_eq!(r.into_result(), Err(DEFAULT_FAILURE_MESSAGE.to_string()));
    }

    #[test]
    fn bare_payload_is_success() {
        let r = ApiResult::<Item>::from_slice(br#"{"id":3}"#).unwrap();
        assert_eq!(r.into_result(), Ok(Item { id: 3 }));
    }

    #[test]
    fn success_without_data_is_an_error() {
        let err = ApiResult::<Item>::from_slice(br#"{"success":true}"#).unwrap_err();
        assert!(matches!(err, ModelError::MissingField { .. }));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(ApiResult::<Item>::from_slice(b"<html>").is_err());
    }

    #[test]
    fn message_extraction_ignores_blank() {
        assert_eq!(extract_message(br#"{"message":"  "}"#), None);
        assert_eq!(extract_message(br#"{"message":42}"#), None);
        assert_eq!(extract_message(br#"[1,2]"#), None);
    }
}
