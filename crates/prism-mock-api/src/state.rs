//! Shared state of the mock service: session table, seeded catalog and
//! the knobs integration tests use to observe and steer the service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};
use prism_models::{
    AdminProfile, CategoryChannel, ChannelStatus, ChannelUserCounts, CommunityRule, Credential,
    Feed, FeedGuest, FeedUser, Notice, UserSummary,
};
use uuid::Uuid;

use crate::config::MockConfig;
use crate::error::MockApiError;

/// One request as seen by the service, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Path relative to the API prefix.
    pub path: String,
    /// Bearer token presented, if any.
    pub bearer: Option<String>,
}

#[derive(Debug, Default)]
struct Sessions {
    /// Access token → expiry.
    access: HashMap<String, Instant>,
    /// Refresh token → account email.
    refresh: HashMap<String, String>,
}

/// Records served by the listing endpoints.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Platform users.
    pub users: Vec<UserSummary>,
    /// Home feed, newest first.
    pub feeds: Vec<Feed>,
    /// Notices.
    pub notices: Vec<Notice>,
    /// Category channels.
    pub channels: Vec<CategoryChannel>,
}

/// State shared across all Axum handlers.
#[derive(Debug)]
pub struct MockState {
    config: MockConfig,
    sessions: Mutex<Sessions>,
    catalog: RwLock<Catalog>,
    refresh_calls: AtomicUsize,
    force_unauthorized: AtomicBool,
    force_unavailable: AtomicBool,
    path_delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    /// Fresh state with the seeded catalog.
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            sessions: Mutex::default(),
            catalog: RwLock::new(Catalog::seeded()),
            refresh_calls: AtomicUsize::new(0),
            force_unauthorized: AtomicBool::new(false),
            force_unavailable: AtomicBool::new(false),
            path_delays: Mutex::default(),
            requests: Mutex::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Issue a token pair for the admin account. A zero `ttl` yields an
    /// access token that is already expired.
    pub fn issue_tokens(&self, ttl: Duration) -> Credential {
        self.issue_for(&self.config.admin_email, ttl)
    }

    fn issue_for(&self, email: &str, ttl: Duration) -> Credential {
        let access = format!("at-{}", Uuid::new_v4());
        let refresh = format!("rt-{}", Uuid::new_v4());
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.access.insert(access.clone(), Instant::now() + ttl);
        sessions.refresh.insert(refresh.clone(), email.to_string());
        Credential::new(access, refresh)
    }

    /// Check email and password; on success return the admin profile with
    /// a fresh token pair.
    pub fn login(&self, email: &str, password: &str) -> Result<AdminProfile, MockApiError> {
        if email != self.config.admin_email || password != self.config.admin_password {
            return Err(MockApiError::Unauthorized(
                "invalid email or password".into(),
            ));
        }
        let pair = self.issue_for(email, self.config.access_ttl);
        Ok(AdminProfile {
            id: Some(1),
            email: Some(email.to_string()),
            display_name: Some("Prism Admin".into()),
            user_name: Some("admin".into()),
            authority: Some("ROLE_ADMIN".into()),
            avatar_url: None,
            token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
        })
    }

    /// Rotate a refresh token into a new pair. The presented refresh token
    /// is consumed.
    pub fn rotate(&self, refresh_token: &str) -> Result<Credential, MockApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let email = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .remove(refresh_token)
            .ok_or_else(|| MockApiError::Unauthorized("refresh token expired".into()))?;
        Ok(self.issue_for(&email, self.config.access_ttl))
    }

    /// Validate a bearer token.
    pub fn authorize(&self, bearer: Option<&str>) -> Result<(), MockApiError> {
        if self.force_unavailable.load(Ordering::SeqCst) {
            return Err(MockApiError::Unavailable("service under maintenance".into()));
        }
        if self.force_unauthorized.load(Ordering::SeqCst) {
            return Err(MockApiError::Unauthorized("access denied".into()));
        }
        let token = bearer.ok_or_else(|| MockApiError::Unauthorized("missing token".into()))?;
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        match sessions.access.get(token) {
            Some(expiry) if *expiry > Instant::now() => Ok(()),
            Some(_) => Err(MockApiError::Unauthorized("access token expired".into())),
            None => Err(MockApiError::Unauthorized("invalid token".into())),
        }
    }

    /// Number of access tokens that are still valid.
    pub fn active_sessions(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .values()
            .filter(|expiry| **expiry > now)
            .count()
    }

    // ------------------------------------------------------------------
    // Test knobs
    // ------------------------------------------------------------------

    /// Calls made to the refresh endpoint so far.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Answer 401 to every business request regardless of the token.
    pub fn set_force_unauthorized(&self, on: bool) {
        self.force_unauthorized.store(on, Ordering::SeqCst);
    }

    /// Answer 503 to every business request regardless of the token.
    pub fn set_force_unavailable(&self, on: bool) {
        self.force_unavailable.store(on, Ordering::SeqCst);
    }

    /// Hold every later request to `path` for `delay` before handling it.
    pub fn set_path_delay(&self, path: &str, delay: Duration) {
        self.path_delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), delay);
    }

    /// Delay configured for `path`.
    pub fn path_delay(&self, path: &str) -> Option<Duration> {
        self.path_delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
    }

    /// Log a request.
    pub fn record(&self, path: &str, bearer: Option<&str>) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                path: path.to_string(),
                bearer: bearer.map(str::to_string),
            });
    }

    /// Requests received so far, in arrival order.
    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Run `f` with read access to the catalog.
    pub fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> R {
        f(&self.catalog.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Change the moderation state of a channel.
    pub fn set_channel_status(&self, id: u64, status: ChannelStatus) -> Result<(), MockApiError> {
        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        let channel = catalog
            .channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| MockApiError::NotFound(format!("channel {id} not found")))?;
        channel.category_channel_status = status;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

const LOCATIONS: [&str; 5] = ["Seoul", "Busan", "Lisbon", "Austin", "Osaka"];
const CHANNEL_NAMES: [&str; 7] = [
    "Board Games",
    "Street Food",
    "Night Running",
    "Film Club",
    "Home Barista",
    "Indie Dev",
    "Urban Sketch",
];

fn timestamp(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day.clamp(1, 28))
        .and_then(|d| d.and_hms_opt(hour % 24, 0, 0))
        .unwrap_or_default()
}

impl Catalog {
    /// Deterministic demo records.
    pub fn seeded() -> Self {
        let users = (1..=45u64)
            .map(|id| UserSummary {
                id,
                email: format!("user{id}@prism.dev"),
                display_name: format!("User {id}"),
                user_name: format!("user{id}"),
                age: Some(18 + (id % 40) as u32),
                gender: Some(if id % 2 == 0 { "F" } else { "M" }.to_string()),
                location: Some(LOCATIONS[(id % 5) as usize].to_string()),
                authority: Some("ROLE_USER".into()),
                birthday: Some(format!("{}-0{}-1{}", 1980 + id % 20, 1 + id % 9, id % 10)),
                avatar_url: None,
                is_withdrawal: id % 11 == 0,
            })
            .collect();

        let feeds = (1..=12u64)
            .rev()
            .map(|id| Feed {
                id,
                author_type: if id % 3 == 0 { "GUEST" } else { "USER" }.into(),
                title: format!("Feed #{id}"),
                content: format!("Body of feed {id}"),
                created_at: timestamp(id as u32, 9),
                updated_at: None,
                view_count: id * 17,
                user: (id % 3 != 0).then(|| FeedUser {
                    user_name: format!("user{id}"),
                }),
                guest: (id % 3 == 0).then(|| FeedGuest {
                    guest_name: format!("guest{id}"),
                }),
                media_file_urls: Vec::new(),
                youtube_urls: Vec::new(),
                likes_count: id * 3,
                comments_count: id,
                share_count: id / 2,
                is_quote: false,
                quote_feed: None,
            })
            .collect();

        let notices = (1..=15u64)
            .map(|id| Notice {
                id,
                title: if id % 5 == 0 {
                    format!("Scheduled maintenance #{id}")
                } else {
                    format!("Release note {id}")
                },
                content: format!("Details for notice {id}"),
                author: "Prism Admin".into(),
                created_at: timestamp(id as u32, 12),
                updated_at: None,
                is_visible: true,
            })
            .collect();

        let channels = CHANNEL_NAMES
            .iter()
            .zip(1u64..)
            .map(|(name, id)| CategoryChannel {
                id,
                display_name: (*name).to_string(),
                owner_user_id: id * 2,
                image_url: None,
                banner_img: None,
                description: format!("{name} community"),
                community_rule: CommunityRule {
                    community_rule: "Be kind.".into(),
                },
                category_channel_user_counts: ChannelUserCounts { join_count: id * 12 },
                category_channel_status: match id % 3 {
                    0 => ChannelStatus::Approved,
                    1 => ChannelStatus::Pending,
                    _ => ChannelStatus::Rejected,
                },
            })
            .collect();

        Self {
            users,
            feeds,
            notices,
            channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MockState {
        MockState::new(MockConfig::default())
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let state = state();
        let expired = state.issue_tokens(Duration::ZERO);
        let valid = state.issue_tokens(Duration::from_secs(60));
        assert!(state.authorize(Some(&expired.access_token)).is_err());
        assert!(state.authorize(Some(&valid.access_token)).is_ok());
        assert!(state.authorize(None).is_err());
        assert_eq!(state.active_sessions(), 1);
    }

    #[test]
    fn refresh_tokens_rotate_once() {
        let state = state();
        let pair = state.issue_tokens(Duration::ZERO);
        let next = state.rotate(&pair.refresh_token).unwrap();
        assert_ne!(next.refresh_token, pair.refresh_token);
        assert!(state.authorize(Some(&next.access_token)).is_ok());
        assert!(state.rotate(&pair.refresh_token).is_err());
        assert_eq!(state.refresh_calls(), 2);
    }

    #[test]
    fn force_unauthorized_overrides_valid_tokens() {
        let state = state();
        let pair = state.issue_tokens(Duration::from_secs(60));
        state.set_force_unauthorized(true);
        assert!(state.authorize(Some(&pair.access_token)).is_err());
    }

    #[test]
    fn path_delays_are_per_path() {
        let state = state();
        state.set_path_delay("/users", Duration::from_millis(5));
        assert_eq!(state.path_delay("/users"), Some(Duration::from_millis(5)));
        assert_eq!(state.path_delay("/notices"), None);
    }

    #[test]
    fn force_unavailable_takes_precedence() {
        let state = state();
        state.set_force_unauthorized(true);
        state.set_force_unavailable(true);
        assert!(matches!(
            state.authorize(None),
            Err(MockApiError::Unavailable(_))
        ));
    }

    #[test]
    fn seeded_catalog_sizes() {
        let catalog = Catalog::seeded();
        assert_eq!(catalog.users.len(), 45);
        assert_eq!(catalog.feeds.len(), 12);
        assert_eq!(catalog.notices.len(), 15);
        assert_eq!(catalog.channels.len(), 7);
    }

    #[test]
    fn unknown_channel_is_not_found() {
        let state = state();
        assert!(matches!(
            state.set_channel_status(99, ChannelStatus::Approved),
            Err(MockApiError::NotFound(_))
        ));
        state.set_channel_status(1, ChannelStatus::Approved).unwrap();
        let status = state.with_catalog(|c| c.channels[0].category_channel_status);
        assert_eq!(status, ChannelStatus::Approved);
    }
}
