//! Prism mock API: an in-process stand-in for the admin REST API.
//!
//! Serves the login, refresh and listing endpoints over a seeded catalog,
//! rotates token pairs on refresh, and optionally publishes live user
//! counts over NATS. Integration tests drive it through [`MockState`]:
//! refresh call counter, request log, forced 401s and refresh latency.

pub mod config;
pub mod error;
pub mod publisher;
pub mod routes;
pub mod state;

use std::sync::Arc;

use tokio::net::TcpListener;

pub use config::MockConfig;
pub use error::MockApiError;
pub use routes::{router, API_PREFIX};
pub use state::{Catalog, MockState, RecordedRequest};

/// Serve the mock API on `listener` until the server stops.
pub async fn serve(listener: TcpListener, state: Arc<MockState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
