//! Terminal notifier: server messages and the login prompt go to stderr
//! so that listings on stdout stay pipeable.

use prism_sdk::{NotificationLevel, Notifier};

/// [`Notifier`] printing to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Success => eprintln!("✔ {message}"),
            NotificationLevel::Error => eprintln!("✖ {message}"),
        }
    }

    fn login_required(&self) {
        eprintln!("Session expired. Run `prism login` to sign in again.");
    }
}
