//! Prism mock API server.
//!
//! Stands in for the admin REST API during development:
//!
//! 1. Accepts the configured admin login and issues short-lived token pairs.
//! 2. Rotates pairs on `/auth/refresh`.
//! 3. Serves seeded users, feeds, notices and channels.
//! 4. Publishes live user counts when `NATS_URL` is set.

use std::sync::Arc;

use prism_mock_api::{MockConfig, MockState, publisher, serve};
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = MockConfig::from_env();
    info!(
        email = %config.admin_email,
        access_ttl_secs = config.access_ttl.as_secs(),
        "admin account configured"
    );

    let listen_port = config.listen_port;
    let nats_url = config.nats_url.clone();
    let state = Arc::new(MockState::new(config));

    if let Some(url) = nats_url {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = publisher::run(url, state).await {
                error!(error = %e, "user-count publisher stopped");
            }
        });
    }

    let addr = format!("0.0.0.0:{listen_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "mock API listening");
    serve(listener, state).await
}
