//! Canonical REST paths and stream endpoint names.
//!
//! The admin client issues and the mock API serves exactly these names.
//!
//! # Layout
//!
//! ```text
//! /auth/login                              ← exchange email/password for a profile
//! /auth/refresh                            ← exchange a refresh token for a new pair
//! /users, /feeds/home, /notices            ← paginated listings
//! /category-channels/all                   ← channel listing
//! /admin/category-channels/{id}/status     ← moderation
//! /files/url                               ← resolve a stored file name to a URL
//!
//! api.{version}.status.user-counts         ← live connected-user counters
//! ```

use crate::admin::ChannelStatus;

/// Current stream endpoint version segment.
const STREAM_VERSION: &str = "v1";

/// Central authority for REST paths relative to the API base address.
///
/// # Examples
///
/// ```
/// use prism_models::ApiPaths;
///
/// assert_eq!(ApiPaths::channel_status(7), "/admin/category-channels/7/status");
/// assert_eq!(ApiPaths::REFRESH, "/auth/refresh");
/// ```
pub struct ApiPaths;

impl ApiPaths {
    /// Login endpoint.
    pub const LOGIN: &'static str = "/auth/login";
    /// Token refresh endpoint.
    pub const REFRESH: &'static str = "/auth/refresh";
    /// User listing.
    pub const USERS: &'static str = "/users";
    /// Home feed listing.
    pub const FEEDS: &'static str = "/feeds/home";
    /// Notice listing.
    pub const NOTICES: &'static str = "/notices";
    /// Category channel listing.
    pub const CATEGORY_CHANNELS: &'static str = "/category-channels/all";
    /// File URL resolution.
    pub const FILE_URL: &'static str = "/files/url";

    /// Route pattern of the moderation endpoint, `{id}` being the channel.
    pub const CHANNEL_STATUS_ROUTE: &'static str = "/admin/category-channels/{id}/status";

    /// Moderation endpoint of one channel.
    pub fn channel_status(channel_id: u64) -> String {
        format!("/admin/category-channels/{channel_id}/status")
    }
}

/// Query value sent for a moderation decision.
pub fn channel_status_query(status: ChannelStatus) -> (String, String) {
    ("status".to_string(), status.to_string())
}

/// Central authority for live stream endpoint names.
///
/// # Examples
///
/// ```
/// use prism_models::StreamEndpoints;
///
/// assert_eq!(StreamEndpoints::user_counts(), "api.v1.status.user-counts");
/// ```
pub struct StreamEndpoints;

impl StreamEndpoints {
    /// Server-to-client stream of [`UserCounts`](crate::UserCounts).
    pub fn user_counts() -> String {
        format!("api.{STREAM_VERSION}.status.user-counts")
    }

    /// Bidirectional channel endpoint for a named topic.
    pub fn channel(topic: &str) -> String {
        format!("api.{STREAM_VERSION}.channel.{topic}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
