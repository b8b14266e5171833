//! Business records managed from the admin console.
//!
//! Field names follow the platform API (camelCase on the wire). Optional
//! fields are `Option` or `#[serde(default)]` so that partially populated
//! records still decode.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::credential::Credential;
use crate::error::ModelError;

// ---------------------------------------------------------------------------
// Admin profile (login)
// ---------------------------------------------------------------------------

/// Profile returned by the login endpoint.
///
/// Carries the token pair alongside display data; only the pair is kept
/// by the credential store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    /// Account id.
    #[serde(default)]
    pub id: Option<u64>,
    /// Login email.
    #[serde(default)]
    pub email: Option<String>,
    /// Name shown in the console header.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Handle.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Granted authority (e.g. `ROLE_ADMIN`).
    #[serde(default)]
    pub authority: Option<String>,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Access token.
    #[serde(default, alias = "accessToken", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AdminProfile {
    /// Extract the token pair carried by the profile.
    pub fn credential(&self) -> Result<Credential, ModelError> {
        let token = self.token.clone().ok_or_else(|| ModelError::MissingField {
            field: "token".into(),
        })?;
        let credential = Credential::new(token, self.refresh_token.clone().unwrap_or_default());
        credential.validate()?;
        Ok(credential)
    }

    /// Best available name for display, falling back to `"admin"`.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.user_name.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("admin")
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A platform user as listed in the console.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// User id.
    pub id: u64,
    /// Email address.
    pub email: String,
    /// Public display name.
    #[serde(default)]
    pub display_name: String,
    /// Handle.
    #[serde(default)]
    pub user_name: String,
    /// Age in years, when disclosed.
    #[serde(default)]
    pub age: Option<u32>,
    /// Self-declared gender.
    #[serde(default)]
    pub gender: Option<String>,
    /// Self-declared location.
    #[serde(default)]
    pub location: Option<String>,
    /// Granted authority.
    #[serde(default)]
    pub authority: Option<String>,
    /// Birthday as sent by the API (`YYYY-MM-DD`).
    #[serde(default)]
    pub birthday: Option<String>,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Whether the account has been withdrawn.
    #[serde(default)]
    pub is_withdrawal: bool,
}

impl UserSummary {
    /// Account state label.
    pub fn account_state(&self) -> &'static str {
        if self.is_withdrawal {
            "withdrawn"
        } else {
            "active"
        }
    }
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

/// Registered author of a feed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedUser {
    /// Author handle.
    pub user_name: String,
}

/// Guest author of a feed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedGuest {
    /// Guest display name.
    pub guest_name: String,
}

/// Feed quoted by another feed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotedFeed {
    /// Quoted title.
    pub title: String,
    /// Quoted body.
    pub content: String,
}

/// A feed post on the home timeline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    /// Feed id.
    pub id: u64,
    /// `USER` or `GUEST`.
    #[serde(default)]
    pub author_type: String,
    /// Title.
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub content: String,
    /// Creation time.
    pub created_at: NaiveDateTime,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    /// View counter.
    #[serde(default)]
    pub view_count: u64,
    /// Registered author, if any.
    #[serde(default)]
    pub user: Option<FeedUser>,
    /// Guest author, if any.
    #[serde(default)]
    pub guest: Option<FeedGuest>,
    /// Attached media.
    #[serde(default)]
    pub media_file_urls: Vec<String>,
    /// Embedded videos.
    #[serde(default)]
    pub youtube_urls: Vec<String>,
    /// Like counter.
    #[serde(default)]
    pub likes_count: u64,
    /// Comment counter.
    #[serde(default)]
    pub comments_count: u64,
    /// Share counter.
    #[serde(default)]
    pub share_count: u64,
    /// Whether this feed is a quote of another.
    #[serde(default)]
    pub is_quote: bool,
    /// The quoted feed.
    #[serde(default)]
    pub quote_feed: Option<QuotedFeed>,
}

impl Feed {
    /// Author name, preferring the registered user over the guest.
    pub fn author_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.user_name.as_str())
            .or_else(|| self.guest.as_ref().map(|g| g.guest_name.as_str()))
            .unwrap_or("anonymous")
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// An announcement shown to platform users.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Notice id.
    pub id: u64,
    /// Title.
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub content: String,
    /// Author name.
    #[serde(default)]
    pub author: String,
    /// Creation time.
    pub created_at: NaiveDateTime,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    /// Whether the notice is published.
    #[serde(default)]
    pub is_visible: bool,
}

// ---------------------------------------------------------------------------
// Category channels
// ---------------------------------------------------------------------------

/// Moderation state of a category channel.
///
/// # Examples
///
/// ```
/// use prism_models::ChannelStatus;
///
/// let s: ChannelStatus = "APPROVED".parse().unwrap();
/// assert_eq!(s, ChannelStatus::Approved);
/// assert_eq!(ChannelStatus::Rejected.to_string(), "REJECTED");
/// ```
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ChannelStatus {
    /// Awaiting review.
    Pending,
    /// Visible to users.
    Approved,
    /// Refused by a moderator.
    Rejected,
}

/// Rules text attached to a channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRule {
    /// Free-form rules text.
    #[serde(default)]
    pub community_rule: String,
}

/// Membership counters of a channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUserCounts {
    /// Number of joined users.
    #[serde(default)]
    pub join_count: u64,
}

/// A user-created topic channel awaiting or past moderation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChannel {
    /// Channel id.
    pub id: u64,
    /// Channel name.
    pub display_name: String,
    /// Creator's user id.
    pub owner_user_id: u64,
    /// Icon image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Banner image URL.
    #[serde(default)]
    pub banner_img: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Rules.
    #[serde(default)]
    pub community_rule: CommunityRule,
    /// Membership counters.
    #[serde(default)]
    pub category_channel_user_counts: ChannelUserCounts,
    /// Moderation state.
    pub category_channel_status: ChannelStatus,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_profile_yields_credential() {
        let profile: AdminProfile = serde_json::from_str(
            r#"{"id":1,"email":"a@b.c","displayName":"Ada","token":"t","refreshToken":"r"}"#,
        )
        .unwrap();
        assert_eq!(profile.credential().unwrap(), Credential::new("t", "r"));
        assert_eq!(profile.label(), "Ada");
    }

    #[test]
    fn login_profile_without_token_is_rejected() {
        let profile = AdminProfile {
            email: Some("a@b.c".into()),
            ..AdminProfile::default()
        };
        assert!(matches!(
            profile.credential(),
            Err(ModelError::MissingField { .. })
        ));
        assert_eq!(profile.label(), "a@b.c");
    }

    #[test]
    fn feed_author_prefers_user() {
        let feed: Feed = serde_json::from_str(
            r#"{"id":1,"title":"t","createdAt":"2024-11-20T10:00:00",
                "user":null,"guest":{"guestName":"visitor"}}"#,
        )
        .unwrap();
        assert_eq!(feed.author_name(), "visitor");
    }

    #[test]
    fn channel_decodes_nested_counters() {
        let channel: CategoryChannel = serde_json::from_str(
            r#"{"id":3,"displayName":"Rust","ownerUserId":9,
                "communityRule":{"communityRule":"be kind"},
                "categoryChannelUserCounts":{"joinCount":12},
                "categoryChannelStatus":"PENDING"}"#,
        )
        .unwrap();
        assert_eq!(channel.category_channel_user_counts.join_count, 12);
        assert_eq!(channel.category_channel_status, ChannelStatus::Pending);
    }

    #[test]
    fn channel_status_parses_case_insensitively() {
        assert_eq!(
            "rejected".parse::<ChannelStatus>().unwrap(),
            ChannelStatus::Rejected
        );
        assert!("maybe".parse::<ChannelStatus>().is_err());
    }

    #[test]
    fn withdrawn_user_state() {
        let user: UserSummary = serde_json::from_str(
            r#"{"id":5,"email":"x@y.z","isWithdrawal":true}"#,
        )
        .unwrap();
        assert_eq!(user.account_state(), "withdrawn");
    }
}
