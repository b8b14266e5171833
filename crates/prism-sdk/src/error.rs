//! SDK error types.
//!
//! [`GatewayError`] is returned by every request issued through the
//! [`Gateway`](crate::Gateway); [`StreamError`] by the live stream
//! subscriber.

use reqwest::StatusCode;

/// Error type for all HTTP operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport-level failure: no response was received.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered 5xx.
    #[error("server error ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, if any.
        message: Option<String>,
    },

    /// The server answered with any other non-success status, including a
    /// 401 on a request that was already replayed after a refresh.
    #[error("request failed ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Client {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, if any.
        message: Option<String>,
    },

    /// The session expired and could not be refreshed; log in again.
    #[error("authentication required")]
    AuthRequired,

    /// The request descriptor cannot be issued.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A 2xx response whose envelope reported `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] prism_models::ModelError),

    /// Invalid or missing configuration (e.g. bad base URL).
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Classify a non-success status.
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        if status.is_server_error() {
            GatewayError::Server {
                status: status.as_u16(),
                message,
            }
        } else {
            GatewayError::Client {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// HTTP status attached to the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Server { status, .. } | GatewayError::Client { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether the caller has to log in again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, GatewayError::AuthRequired) || self.status() == Some(401)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Decode(e.into())
    }
}

/// Error type for the live stream subscriber.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Connecting or authenticating the session failed. Fatal for the
    /// session; open a new one.
    #[error("stream connection failed: {0}")]
    Connect(String),

    /// Subscribing to an endpoint failed.
    #[error("stream subscribe failed: {0}")]
    Subscribe(String),

    /// Publishing on a channel failed.
    #[error("stream publish failed: {0}")]
    Publish(String),

    /// The session was closed.
    #[error("stream session is closed")]
    Closed,

    /// A payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<async_nats::ConnectError> for StreamError {
    fn from(e: async_nats::ConnectError) -> Self {
        StreamError::Connect(e.to_string())
    }
}

impl From<async_nats::SubscribeError> for StreamError {
    fn from(e: async_nats::SubscribeError) -> Self {
        StreamError::Subscribe(e.to_string())
    }
}

impl From<async_nats::PublishError> for StreamError {
    fn from(e: async_nats::PublishError) -> Self {
        StreamError::Publish(e.to_string())
    }
}
