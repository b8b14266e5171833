//! Mock API configuration.
//!
//! Built from environment variables at startup and shared with handlers
//! through [`MockState`](crate::MockState).

use std::time::Duration;

/// Default admin login.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@prism.dev";
/// Default admin password.
pub const DEFAULT_ADMIN_PASSWORD: &str = "prism-admin";

/// Global configuration of the mock service.
#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    /// Port to listen on (default `8080`).
    pub listen_port: u16,
    /// Lifetime of issued access tokens.
    pub access_ttl: Duration,
    /// Accepted admin email.
    pub admin_email: String,
    /// Accepted admin password.
    pub admin_password: String,
    /// Artificial latency of the refresh endpoint.
    pub refresh_delay: Duration,
    /// NATS server for the user-count publisher; disabled when unset.
    pub nats_url: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            access_ttl: Duration::from_secs(300),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            refresh_delay: Duration::ZERO,
            nats_url: None,
        }
    }
}

impl MockConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                | Default           | Description                    |
    /// |-------------------------|-------------------|--------------------------------|
    /// | `MOCK_API_PORT`         | `8080`            | HTTP listen port               |
    /// | `MOCK_ACCESS_TTL_SECS`  | `300`             | Access token lifetime          |
    /// | `MOCK_ADMIN_EMAIL`      | `admin@prism.dev` | Accepted login email           |
    /// | `MOCK_ADMIN_PASSWORD`   | `prism-admin`     | Accepted login password        |
    /// | `MOCK_REFRESH_DELAY_MS` | `0`               | Latency added to `/auth/refresh` |
    /// | `NATS_URL`              | unset             | Enables the user-count stream  |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_port: parse_env("MOCK_API_PORT").unwrap_or(defaults.listen_port),
            access_ttl: parse_env("MOCK_ACCESS_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.access_ttl),
            admin_email: std::env::var("MOCK_ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: std::env::var("MOCK_ADMIN_PASSWORD")
                .unwrap_or(defaults.admin_password),
            refresh_delay: parse_env("MOCK_REFRESH_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.refresh_delay),
            nats_url: std::env::var("NATS_URL").ok().filter(|u| !u.is_empty()),
        }
    }

    /// Override the refresh latency.
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Override the access token lifetime.
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
