//! User-facing notifications.
//!
//! The gateway reports server messages and terminal authentication
//! failures through a [`Notifier`]. Front ends plug in their own
//! implementation (toasts, status line, stderr); the default one logs.

use tracing::{error, info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    /// Message attached to a 2xx response.
    Success,
    /// Message attached to a non-2xx response.
    Error,
}

/// Sink for server messages and the login redirect.
pub trait Notifier: Send + Sync {
    /// Show a server-provided message.
    fn notify(&self, level: NotificationLevel, message: &str);

    /// The session ended and could not be refreshed. Called exactly once
    /// per failed refresh; front ends navigate to their login view.
    fn login_required(&self);
}

/// [`Notifier`] that reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Success => info!("{message}"),
            NotificationLevel::Error => error!("{message}"),
        }
    }

    fn login_required(&self) {
        warn!("session expired, login required");
    }
}
