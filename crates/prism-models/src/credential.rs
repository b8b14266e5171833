//! Bearer credential held by the admin session.
//!
//! A [`Credential`] pairs a short-lived access token with the longer-lived
//! refresh token used to obtain a new pair once the access token expires.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::envelope::ApiResult;
use crate::error::ModelError;

/// Access/refresh token pair.
///
/// Field names vary between endpoints: the login payload calls the access
/// token `token`, the refresh endpoint calls it `accessToken`. Both are
/// accepted on input; output always uses `accessToken`.
///
/// # Examples
///
/// ```
/// use prism_models::Credential;
///
/// let c: Credential =
///     serde_json::from_str(r#"{"token":"a1","refreshToken":"r1"}"#).unwrap();
/// assert_eq!(c.access_token, "a1");
/// assert_eq!(c.refresh_token, "r1");
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Bearer token attached to every authenticated request.
    #[serde(alias = "token")]
    pub access_token: String,
    /// Token exchanged at the refresh endpoint for a new pair.
    #[serde(default)]
    pub refresh_token: String,
}

impl Credential {
    /// Create a credential from its two tokens.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Reject credentials that cannot authenticate anything.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.access_token.is_empty() {
            return Err(ModelError::EmptyToken {
                field: "accessToken".into(),
            });
        }
        Ok(())
    }

    /// Whether a refresh can be attempted with this credential.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Decode the body of a refresh-endpoint response.
    ///
    /// Accepts the pair either bare or wrapped in a `{ success, data }`
    /// envelope. Both tokens must be present and non-empty.
    pub fn from_refresh_payload(body: &[u8]) -> Result<Self, ModelError> {
        let credential = match ApiResult::<Credential>::from_slice(body)? {
            ApiResult::Ok { data, .. } => data,
            ApiResult::Failed { .. } => {
                return Err(ModelError::MissingField {
                    field: "data".into(),
                })
            }
        };
        credential.validate()?;
        if !credential.can_refresh() {
            return Err(ModelError::EmptyToken {
                field: "refreshToken".into(),
            });
        }
        Ok(credential)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_access_token_name() {
        let c = Credential::new("a", "r");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
    }

    #[test]
    fn debug_output_hides_tokens() {
        let c = Credential::new("secret-access", "secret-refresh");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn empty_access_token_is_invalid() {
        let c = Credential::new("", "r");
        assert!(matches!(c.validate(), Err(ModelError::EmptyToken { .. })));
    }

    #[test]
    fn refresh_payload_bare() {
        let c = Credential::from_refresh_payload(br#"{"accessToken":"new","refreshToken":"new2"}"#)
            .unwrap();
        assert_eq!(c, Credential::new("new", "new2"));
    }

    #[test]
    fn refresh_payload_enveloped() {
        let body = br#"{"success":true,"data":{"token":"new","refreshToken":"new2"}}"#;
        let c = Credential::from_refresh_payload(body).unwrap();
        assert_eq!(c.access_token, "new");
    }

    #[test]
    fn refresh_payload_without_refresh_token_is_rejected() {
        let err = Credential::from_refresh_payload(br#"{"accessToken":"new"}"#).unwrap_err();
        assert!(matches!(err, ModelError::EmptyToken { ref field } if field == "refreshToken"));
    }

    #[test]
    fn refresh_payload_failure_envelope_is_rejected() {
        let body = br#"{"success":false,"message":"expired"}"#;
        assert!(Credential::from_refresh_payload(body).is_err());
    }
}
