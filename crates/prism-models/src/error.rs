//! Error types for the `prism-models` crate.
//!
//! All fallible decoders and conversions in this crate return variants of
//! [`ModelError`].

/// Errors produced when decoding or validating model types.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A required field was missing from an otherwise well-formed payload.
    #[error("missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A token value was present but empty.
    #[error("empty token in field: {field}")]
    EmptyToken {
        /// The name of the empty field.
        field: String,
    },

    /// The payload was not valid JSON for the expected shape.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_missing_field() {
        let err = ModelError::MissingField {
            field: "refreshToken".into(),
        };
        assert_eq!(err.to_string(), "missing required field: refreshToken");
    }

    #[test]
    fn error_display_empty_token() {
        let err = ModelError::EmptyToken {
            field: "token".into(),
        };
        assert_eq!(err.to_string(), "empty token in field: token");
    }

    #[test]
    fn json_errors_convert() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ModelError = parse.into();
        assert!(err.to_string().starts_with("malformed payload:"));
    }
}
