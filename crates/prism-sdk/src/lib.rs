//! # Prism SDK
//!
//! Client library for the **Prism** admin console.
//!
//! The SDK provides:
//!
//! * [`Gateway`] – authenticated HTTP front door. Attaches the bearer
//!   token, reports server messages, and recovers from an expired access
//!   token with a single shared refresh followed by a replay.
//! * [`AdminClient`] – typed console operations (login, listings,
//!   channel moderation, file URLs).
//! * [`StreamSession`] – live stream subscriber over NATS.
//! * [`CredentialStore`] – owner of the token pair, in memory or
//!   persisted under the user config directory.
//! * [`ApiPaths`] / [`StreamEndpoints`] – canonical path and endpoint
//!   names, re-exported from [`prism_models`].
//!
//! Models from [`prism_models`] are re-exported for convenience.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prism_sdk::{AdminClient, ClientConfig, Gateway, MemoryCredentialStore, PageRequest};
//!
//! # async fn run() -> Result<(), prism_sdk::GatewayError> {
//! let gateway = Gateway::new(
//!     ClientConfig::from_env(),
//!     Arc::new(MemoryCredentialStore::new()),
//! )?;
//! let admin = AdminClient::new(Arc::new(gateway));
//! admin.login("admin@prism.dev", "secret").await?;
//! let users = admin.list_users(PageRequest::new(0, 20)).await?;
//! println!("{} users", users.total_elements);
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod refresh;
pub mod request;
pub mod stream;

pub use admin::{AdminClient, NoticeQuery};
pub use config::ClientConfig;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{GatewayError, StreamError};
pub use gateway::Gateway;
pub use notify::{NotificationLevel, Notifier, TracingNotifier};
pub use refresh::{HttpTokenRefresher, RefreshCoordinator, TokenRefresher};
pub use request::{ApiRequest, ApiResponse};
pub use stream::{Channel, StreamSession, Subscription};

pub use prism_models::{
    AdminProfile, ApiPaths, ApiResult, CategoryChannel, ChannelStatus, Credential, Feed, Notice, Page,
    PageRequest, StreamEndpoints, UserCounts, UserSummary,
};
