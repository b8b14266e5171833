//! Periodic user-count publisher for the live dashboard.

use std::sync::Arc;
use std::time::Duration;

use prism_models::{StreamEndpoints, UserCounts};
use tracing::{info, warn};

use crate::state::MockState;

/// Interval between two publications.
pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(2);

/// Connect to NATS and publish [`UserCounts`] every [`PUBLISH_INTERVAL`]
/// until the connection fails.
///
/// Authenticated users are the sessions holding a valid access token;
/// anonymous visitors are simulated.
pub async fn run(nats_url: String, state: Arc<MockState>) -> Result<(), async_nats::Error> {
    let client = async_nats::connect(nats_url.as_str()).await?;
    let subject = StreamEndpoints::user_counts();
    info!(url = %nats_url, %subject, "user-count publisher started");

    let mut ticker = tokio::time::interval(PUBLISH_INTERVAL);
    let mut tick: u64 = 0;
    loop {
        ticker.tick().await;
        tick = tick.wrapping_add(1);
        let counts = UserCounts {
            authenticated_user_count: state.active_sessions() as u64,
            anonymous_user_count: 20 + (tick * 7) % 15,
        };
        let payload = serde_json::to_vec(&counts)?;
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            warn!(error = %e, "failed to publish user counts");
            return Err(e.into());
        }
    }
}
