//! Client configuration.
//!
//! The API base address and stream endpoint are read once at startup,
//! from environment variables or explicit overrides, and then shared by
//! the [`Gateway`](crate::Gateway) and the stream subscriber.

use std::time::Duration;

use reqwest::Url;

use prism_models::ApiPaths;
use crate::error::GatewayError;

/// Default API base address.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
/// Default stream transport address.
pub const DEFAULT_STREAM_URL: &str = "nats://localhost:4222";
/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings shared by every request path.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base address every request path is appended to.
    pub api_base_url: String,
    /// Live stream transport address.
    pub stream_url: String,
    /// Path of the refresh endpoint; never issued through the gateway.
    pub refresh_path: String,
    /// Path of the login endpoint.
    pub login_path: String,
    /// Network-level timeout applied to each HTTP exchange.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            refresh_path: ApiPaths::REFRESH.to_string(),
            login_path: ApiPaths::LOGIN.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                     | Default                         |
    /// |------------------------------|---------------------------------|
    /// | `PRISM_API_BASE_URL`         | `http://localhost:8080/api/v1`  |
    /// | `PRISM_STREAM_URL`           | `nats://localhost:4222`         |
    /// | `PRISM_REQUEST_TIMEOUT_SECS` | `30`                            |
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("PRISM_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = std::env::var("PRISM_STREAM_URL") {
            config.stream_url = url;
        }
        if let Some(secs) = std::env::var("PRISM_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Configuration pointing at the given API base address.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Override the stream transport address.
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }

    /// Override the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve a request path against the base address.
    ///
    /// The path is appended verbatim (base paths such as `/api/v1` are
    /// kept); a missing leading slash is added.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, GatewayError> {
        let base = self.api_base_url.trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined).map_err(|e| GatewayError::Config(format!("invalid URL {joined}: {e}")))
    }

    /// Whether `path` targets the refresh endpoint.
    pub fn is_refresh_path(&self, path: &str) -> bool {
        normalize(path) == normalize(&self.refresh_path)
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    path.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_keeps_base_path() {
        let cfg = ClientConfig::new("http://api.test/api/v1/");
        assert_eq!(
            cfg.endpoint_url("/users").unwrap().as_str(),
            "http://api.test/api/v1/users"
        );
        assert_eq!(
            cfg.endpoint_url("notices").unwrap().as_str(),
            "http://api.test/api/v1/notices"
        );
    }

    #[test]
    fn endpoint_url_rejects_garbage_base() {
        let cfg = ClientConfig::new("not a url");
        assert!(matches!(
            cfg.endpoint_url("/users"),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn refresh_path_detection_ignores_query_and_slashes() {
        let cfg = ClientConfig::default();
        assert!(cfg.is_refresh_path("/auth/refresh"));
        assert!(cfg.is_refresh_path("auth/refresh/"));
        assert!(cfg.is_refresh_path("/auth/refresh?x=1"));
        assert!(!cfg.is_refresh_path("/auth/login"));
    }

    #[test]
    fn builder_overrides() {
        let cfg = ClientConfig::new("http://a")
            .with_stream_url("nats://b:4222")
            .with_request_timeout(Duration::from_secs(2));
        assert_eq!(cfg.stream_url, "nats://b:4222");
        assert_eq!(cfg.request_timeout, Duration::from_secs(2));
        assert_eq!(cfg.refresh_path, "/auth/refresh");
    }
}
