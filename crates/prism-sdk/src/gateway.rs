//! Authenticated request gateway.
//!
//! Every REST call of the admin console goes through [`Gateway::issue`],
//! which attaches the bearer token, reports server messages, and recovers
//! from an expired access token by refreshing once and replaying.
//!
//! # Typical usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prism_sdk::{ApiRequest, ClientConfig, Gateway, MemoryCredentialStore};
//!
//! # async fn run() -> Result<(), prism_sdk::GatewayError> {
//! let gateway = Gateway::new(
//!     ClientConfig::from_env(),
//!     Arc::new(MemoryCredentialStore::new()),
//! )?;
//! let response = gateway.issue(ApiRequest::get("/users").query("page", 0)).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::GatewayError;
use crate::notify::{NotificationLevel, Notifier, TracingNotifier};
use crate::refresh::{Admission, HttpTokenRefresher, RefreshCoordinator, RefreshTicket, TokenRefresher};
use crate::request::{ApiRequest, ApiResponse};

/// Authenticated HTTP front door to the admin API.
///
/// Cheap to share behind an [`Arc`]; concurrent callers share one refresh
/// coordinator, so a burst of 401s triggers a single refresh exchange.
pub struct Gateway {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    notifier: Arc<dyn Notifier>,
    coordinator: RefreshCoordinator,
}

impl Gateway {
    /// Build a gateway with the HTTP refresher and the tracing notifier.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let refresher = HttpTokenRefresher::new(http.clone(), &config)?;
        Ok(Self {
            http,
            config,
            store,
            refresher: Arc::new(refresher),
            notifier: Arc::new(TracingNotifier),
            coordinator: RefreshCoordinator::new(),
        })
    }

    /// Replace the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the token refresher.
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Credential store shared with the gateway.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Issue a request, recovering once from an expired access token.
    ///
    /// # Errors
    ///
    /// * [`GatewayError::InvalidRequest`] – the path is the refresh endpoint.
    /// * [`GatewayError::AuthRequired`] – the session could not be refreshed.
    /// * [`GatewayError::Client`] / [`GatewayError::Server`] – final non-2xx
    ///   status, including a 401 on the replayed request.
    /// * [`GatewayError::Network`] – no response was received.
    pub async fn issue(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        if self.config.is_refresh_path(request.path()) {
            return Err(GatewayError::InvalidRequest(format!(
                "{} is reserved for token refresh",
                request.path()
            )));
        }
        if !request.is_authenticated() {
            return self.dispatch(&request, None).await?.error_for_status();
        }

        let sent = self.store.access_token();
        let response = self.dispatch(&request, sent.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return response.error_for_status();
        }

        match self
            .coordinator
            .admit(&request, sent.as_deref(), self.store.as_ref())
        {
            Admission::Rotated => self.replay(&request).await,
            Admission::SignedOut => Err(GatewayError::AuthRequired),
            Admission::Queued(rx) => match rx.await {
                Ok(Ok(())) => self.replay(&request).await,
                Ok(Err(e)) => Err(e),
                // Leader dropped before the refresh finished.
                Err(_) => Err(GatewayError::AuthRequired),
            },
            Admission::Leader(ticket) => self.lead_refresh(ticket, &request).await,
        }
    }

    async fn lead_refresh(
        &self,
        ticket: RefreshTicket<'_>,
        request: &ApiRequest,
    ) -> Result<ApiResponse, GatewayError> {
        let refresh_token = self
            .store
            .current()
            .filter(|c| c.can_refresh())
            .map(|c| c.refresh_token);

        let outcome = match refresh_token {
            Some(token) => self.refresher.refresh(&token).await,
            None => Err(GatewayError::AuthRequired),
        };

        match outcome {
            Ok(credential) => {
                let released = ticket.succeed(self.store.as_ref(), credential);
                info!(released, "access token refreshed");
                self.replay(request).await
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                ticket.fail(self.store.as_ref());
                self.notifier.login_required();
                Err(GatewayError::AuthRequired)
            }
        }
    }

    /// Second and last attempt: a plain dispatch with the current token.
    async fn replay(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        let token = self.store.access_token();
        self.dispatch(request, token.as_deref())
            .await?
            .error_for_status()
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, GatewayError> {
        let mut url = self.config.endpoint_url(request.path())?;
        if !request.query_pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_pairs());
        }

        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(
            method = %request.method(),
            path = request.path(),
            status = status.as_u16(),
            "request completed"
        );

        let response = ApiResponse::new(status, body);
        if let Some(message) = response.message() {
            let level = if status.is_success() {
                NotificationLevel::Success
            } else {
                NotificationLevel::Error
            };
            self.notifier.notify(level, &message);
        }
        Ok(response)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("api_base_url", &self.config.api_base_url)
            .field("refreshing", &self.coordinator.is_refreshing())
            .finish_non_exhaustive()
    }
}
