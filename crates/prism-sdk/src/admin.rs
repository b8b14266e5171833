//! Typed admin console operations built on the [`Gateway`].

use std::sync::Arc;

use prism_models::{
    channel_status_query, AdminProfile, ApiPaths, CategoryChannel, ChannelStatus, Feed, Notice,
    Page, PageRequest, UserSummary, DEFAULT_FAILURE_MESSAGE,
};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::request::ApiRequest;

/// Default page size of the user listing.
pub const USERS_PAGE_SIZE: u32 = 20;
/// Default page size of the feed, notice and channel listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Filter and page selection for the notice listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeQuery {
    /// Free-text search; empty matches everything.
    pub search: String,
    /// Page selection.
    pub page: PageRequest,
}

impl Default for NoticeQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: PageRequest::new(0, DEFAULT_PAGE_SIZE),
        }
    }
}

impl NoticeQuery {
    /// Query matching `search` on the first page.
    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    /// Select a page.
    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// Admin console client.
#[derive(Debug, Clone)]
pub struct AdminClient {
    gateway: Arc<Gateway>,
}

impl AdminClient {
    /// Wrap a shared gateway.
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Underlying gateway.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Exchange email and password for a session.
    ///
    /// The token pair is stored; the rest of the profile is only returned.
    /// Bad credentials surface as [`GatewayError::Client`] with status 401.
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminProfile, GatewayError> {
        let request = ApiRequest::post(self.gateway.config().login_path.clone())
            .json(&serde_json::json!({ "email": email, "password": password }))?
            .anonymous();
        let profile: AdminProfile = self.gateway.issue(request).await?.data()?;
        self.gateway.store().set_current(profile.credential()?);
        info!(user = profile.label(), "logged in");
        Ok(profile)
    }

    /// Forget the stored session.
    pub fn logout(&self) {
        self.gateway.store().clear();
        info!("logged out");
    }

    /// Whether a session is stored.
    pub fn is_logged_in(&self) -> bool {
        self.gateway.store().current().is_some()
    }

    /// One page of platform users.
    pub async fn list_users(&self, page: PageRequest) -> Result<Page<UserSummary>, GatewayError> {
        self.page(ApiRequest::get(ApiPaths::USERS).query_all(page.to_query()))
            .await
    }

    /// One page of the home feed.
    pub async fn list_feeds(&self, page: PageRequest) -> Result<Page<Feed>, GatewayError> {
        self.page(ApiRequest::get(ApiPaths::FEEDS).query_all(page.to_query()))
            .await
    }

    /// One page of notices, newest first.
    pub async fn list_notices(&self, query: &NoticeQuery) -> Result<Page<Notice>, GatewayError> {
        let request = ApiRequest::get(ApiPaths::NOTICES)
            .query("search", &query.search)
            .query_all(query.page.to_query())
            .query("sort", "createdAt,desc");
        self.page(request).await
    }

    /// One page of category channels.
    pub async fn list_category_channels(
        &self,
        page: PageRequest,
    ) -> Result<Page<CategoryChannel>, GatewayError> {
        self.page(ApiRequest::get(ApiPaths::CATEGORY_CHANNELS).query_all(page.to_query()))
            .await
    }

    /// Approve or reject a channel.
    pub async fn set_channel_status(
        &self,
        channel_id: u64,
        status: ChannelStatus,
    ) -> Result<(), GatewayError> {
        let (key, value) = channel_status_query(status);
        let request = ApiRequest::post(ApiPaths::channel_status(channel_id)).query(key, value);
        let response = self.gateway.issue(request).await?;
        // Acknowledgement bodies carry `success` and `message` but no data;
        // an empty 2xx body is a plain acknowledgement.
        if is_rejection(response.bytes())? {
            return Err(GatewayError::Rejected(
                response
                    .message()
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            ));
        }
        info!(channel_id, %status, "channel status updated");
        Ok(())
    }

    /// Resolve a stored file name to a downloadable URL.
    ///
    /// An empty name resolves to an empty string without a request.
    pub async fn file_url(&self, filename: &str) -> Result<String, GatewayError> {
        if filename.is_empty() {
            return Ok(String::new());
        }
        let response = self
            .gateway
            .issue(ApiRequest::get(ApiPaths::FILE_URL).query("filename", filename))
            .await?;
        Ok(response.text().trim().to_string())
    }

    async fn page<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Page<T>, GatewayError> {
        self.gateway.issue(request).await?.data()
    }
}

/// Whether an acknowledgement body explicitly reports `success: false`.
fn is_rejection(body: &[u8]) -> Result<bool, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(false);
    }
    let ack: serde_json::Value = serde_json::from_slice(body)?;
    Ok(ack.get("success").and_then(serde_json::Value::as_bool) == Some(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_query_defaults() {
        let q = NoticeQuery::search("outage").with_page(PageRequest::new(2, 0));
        assert_eq!(q.search, "outage");
        assert_eq!(q.page, PageRequest::new(2, 1));
        assert_eq!(NoticeQuery::default().page.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn empty_acknowledgement_is_success() {
        assert!(!is_rejection(b"").unwrap());
        assert!(!is_rejection(b" \n").unwrap());
        assert!(!is_rejection(br#"{"success":true,"message":"ok"}"#).unwrap());
        assert!(is_rejection(br#"{"success":false}"#).unwrap());
        assert!(is_rejection(b"not json").is_err());
    }
}
