//! Single-flight token refresh.
//!
//! When several requests fail with 401 at once, only the first one (the
//! *leader*) talks to the refresh endpoint. Everyone else is parked in the
//! [`RefreshCoordinator`] queue and released, in enqueue order, with the
//! outcome of the refresh. Each released caller replays its own request,
//! so a cancelled or slow leader never holds anyone else's replay.
//!
//! ```text
//!   401 ──▶ admit() ──┬─▶ Leader(ticket) ──▶ refresh ──▶ succeed()/fail() ──▶ replay own request
//!                     ├─▶ Queued(rx)    ◀──────────── outcome ──────┘           replay own request
//!                     ├─▶ Rotated  ──▶ replay with the current token
//!                     └─▶ SignedOut ──▶ AuthRequired
//! ```
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use futures::future::BoxFuture;
use prism_models::Credential;
use reqwest::Url;
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::GatewayError;
use crate::request::ApiRequest;

/// Outcome of a refresh cycle delivered to a parked request: `Ok` once
/// the new pair is stored, [`GatewayError::AuthRequired`] otherwise.
pub type RefreshOutcome = Result<(), GatewayError>;

/// Exchanges a refresh token for a new credential.
pub trait TokenRefresher: Send + Sync {
    /// Perform one refresh exchange.
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<Credential, GatewayError>>;
}

/// [`TokenRefresher`] that posts `{ "refreshToken": … }` to the refresh
/// endpoint.
///
/// The exchange bypasses the gateway: it never carries a bearer token and
/// its 401 is a plain failure, never another refresh.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpTokenRefresher {
    /// Refresher targeting `config.refresh_path` under the base address.
    pub fn new(http: reqwest::Client, config: &ClientConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            http,
            endpoint: config.endpoint_url(&config.refresh_path)?,
        })
    }

    async fn exchange(&self, refresh_token: &str) -> Result<Credential, GatewayError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(GatewayError::from_status(
                status,
                prism_models::extract_message(&body),
            ));
        }
        Ok(Credential::from_refresh_payload(&body)?)
    }
}

impl TokenRefresher for HttpTokenRefresher {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<Credential, GatewayError>> {
        Box::pin(self.exchange(refresh_token))
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// A request parked while a refresh is in flight.
#[derive(Debug)]
pub struct PendingRequest {
    request: ApiRequest,
    reply: oneshot::Sender<RefreshOutcome>,
}

impl PendingRequest {
    /// The parked request.
    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    /// Release the waiting caller with the refresh outcome.
    pub fn resolve(self, outcome: RefreshOutcome) {
        // The caller may have given up on the future; nothing to do then.
        let _ = self.reply.send(outcome);
    }
}

#[derive(Debug, Default)]
struct State {
    refreshing: bool,
    pending: VecDeque<PendingRequest>,
}

/// Refresh-in-flight flag plus the queue of parked requests.
///
/// The stale-token check and check-and-set in [`admit`](Self::admit), and
/// the store update plus reset-and-drain in [`RefreshTicket::succeed`] /
/// [`RefreshTicket::fail`], each run under one short synchronous lock
/// that is never held across an `.await`. A 401 therefore either sees the
/// rotated token or is parked before the queue is drained.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

/// Result of [`RefreshCoordinator::admit`].
#[derive(Debug)]
pub enum Admission<'a> {
    /// No refresh was running; the caller must perform it.
    Leader(RefreshTicket<'a>),
    /// A refresh is running; await its outcome, then replay.
    Queued(oneshot::Receiver<RefreshOutcome>),
    /// The store already holds a different access token than the one sent;
    /// replay with it.
    Rotated,
    /// The session was cleared after the request was sent.
    SignedOut,
}

impl RefreshCoordinator {
    /// Idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a 401 for `request`, which was sent with `sent` as its
    /// bearer token.
    pub fn admit(
        &self,
        request: &ApiRequest,
        sent: Option<&str>,
        store: &dyn CredentialStore,
    ) -> Admission<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match (sent, store.access_token()) {
            (sent, Some(current)) if sent != Some(current.as_str()) => {
                debug!(path = request.path(), "token rotated in flight");
                return Admission::Rotated;
            }
            (Some(_), None) => return Admission::SignedOut,
            _ => {}
        }

        if state.refreshing {
            let (reply, rx) = oneshot::channel();
            state.pending.push_back(PendingRequest {
                request: request.clone(),
                reply,
            });
            debug!(
                path = request.path(),
                queued = state.pending.len(),
                "request parked behind refresh"
            );
            Admission::Queued(rx)
        } else {
            state.refreshing = true;
            debug!(path = request.path(), "leading token refresh");
            Admission::Leader(RefreshTicket {
                coordinator: Some(self),
            })
        }
    }

    /// Whether a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refreshing
    }

    /// Number of parked requests.
    pub fn pending_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    fn release(&self, update: impl FnOnce()) -> Vec<PendingRequest> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        update();
        state.refreshing = false;
        state.pending.drain(..).collect()
    }
}

/// Proof of leadership over the running refresh.
///
/// Dropping an unfinished ticket (leader cancelled or panicked) releases
/// the flag and drops every parked sender, which the waiting callers see
/// as [`GatewayError::AuthRequired`].
#[derive(Debug)]
pub struct RefreshTicket<'a> {
    coordinator: Option<&'a RefreshCoordinator>,
}

impl RefreshTicket<'_> {
    /// Store `credential`, end the refresh and release every parked
    /// request, in enqueue order, to replay with it. Returns how many were
    /// released.
    pub fn succeed(mut self, store: &dyn CredentialStore, credential: Credential) -> usize {
        let pending = self.release(|| store.set_current(credential));
        let released = pending.len();
        for parked in pending {
            parked.resolve(Ok(()));
        }
        released
    }

    /// Clear the store, end the refresh and reject every parked request
    /// with [`GatewayError::AuthRequired`].
    pub fn fail(mut self, store: &dyn CredentialStore) -> usize {
        let pending = self.release(|| store.clear());
        let rejected = pending.len();
        for parked in pending {
            parked.resolve(Err(GatewayError::AuthRequired));
        }
        rejected
    }

    fn release(&mut self, update: impl FnOnce()) -> Vec<PendingRequest> {
        match self.coordinator.take() {
            Some(coordinator) => coordinator.release(update),
            None => Vec::new(),
        }
    }
}

impl Drop for RefreshTicket<'_> {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.take() {
            let dropped = coordinator.release(|| ());
            debug!(dropped = dropped.len(), "refresh abandoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;

    fn leader(admission: Admission<'_>) -> RefreshTicket<'_> {
        match admission {
            Admission::Leader(ticket) => ticket,
            other => panic!("expected leadership, got {other:?}"),
        }
    }

    fn queued(admission: Admission<'_>) -> oneshot::Receiver<RefreshOutcome> {
        match admission {
            Admission::Queued(rx) => rx,
            other => panic!("expected to be queued, got {other:?}"),
        }
    }

    fn expired_session() -> MemoryCredentialStore {
        MemoryCredentialStore::with_credential(Credential::new("old", "r1"))
    }

    #[test]
    fn first_caller_leads_others_queue_in_order() {
        let store = expired_session();
        let coordinator = RefreshCoordinator::new();
        let mut ticket = leader(coordinator.admit(&ApiRequest::get("/users"), Some("old"), &store));
        let _a = queued(coordinator.admit(&ApiRequest::get("/feeds/home"), Some("old"), &store));
        let _b = queued(coordinator.admit(&ApiRequest::get("/notices"), Some("old"), &store));
        assert!(coordinator.is_refreshing());
        assert_eq!(coordinator.pending_len(), 2);

        let pending = ticket.release(|| ());
        let paths: Vec<_> = pending.iter().map(|p| p.request().path()).collect();
        assert_eq!(paths, ["/feeds/home", "/notices"]);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending_len(), 0);
    }

    #[tokio::test]
    async fn success_stores_pair_and_releases_waiters() {
        let store = expired_session();
        let coordinator = RefreshCoordinator::new();
        let ticket = leader(coordinator.admit(&ApiRequest::get("/users"), Some("old"), &store));
        let rx = queued(coordinator.admit(&ApiRequest::get("/notices"), Some("old"), &store));

        assert_eq!(ticket.succeed(&store, Credential::new("new", "r2")), 1);
        assert!(rx.await.unwrap().is_ok());
        assert_eq!(store.access_token().as_deref(), Some("new"));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn failure_clears_store_and_rejects_waiters() {
        let store = expired_session();
        let coordinator = RefreshCoordinator::new();
        let ticket = leader(coordinator.admit(&ApiRequest::get("/users"), Some("old"), &store));
        let rx = queued(coordinator.admit(&ApiRequest::get("/notices"), Some("old"), &store));

        assert_eq!(ticket.fail(&store), 1);
        assert!(matches!(rx.await.unwrap(), Err(GatewayError::AuthRequired)));
        assert!(store.current().is_none());
    }

    #[test]
    fn late_401_after_rotation_replays_instead_of_refreshing() {
        let store = expired_session();
        let coordinator = RefreshCoordinator::new();
        let ticket = leader(coordinator.admit(&ApiRequest::get("/users"), Some("old"), &store));
        ticket.succeed(&store, Credential::new("new", "r2"));

        // A request sent with the old token whose 401 lands after the
        // rotation must not start a second refresh with the spent token.
        let late = coordinator.admit(&ApiRequest::get("/feeds/home"), Some("old"), &store);
        assert!(matches!(late, Admission::Rotated));
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn unauthorized_after_sign_out_requires_login() {
        let store = expired_session();
        store.clear();
        let coordinator = RefreshCoordinator::new();
        let admission = coordinator.admit(&ApiRequest::get("/users"), Some("old"), &store);
        assert!(matches!(admission, Admission::SignedOut));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn dropped_ticket_rejects_waiters_and_resets() {
        let store = expired_session();
        let coordinator = RefreshCoordinator::new();
        let ticket = leader(coordinator.admit(&ApiRequest::get("/users"), Some("old"), &store));
        let rx = queued(coordinator.admit(&ApiRequest::get("/feeds/home"), Some("old"), &store));

        drop(ticket);
        assert!(rx.await.is_err());
        assert!(!coordinator.is_refreshing());

        // Next 401 starts a fresh refresh.
        let _next = leader(coordinator.admit(&ApiRequest::get("/users"), Some("old"), &store));
    }
}
