//! Payloads pushed over the live stream transport.

use serde::{Deserialize, Serialize};

/// Connected-user counters published on the user-count stream.
///
/// # Examples
///
/// ```
/// use prism_models::UserCounts;
///
/// let c: UserCounts = serde_json::from_str(
///     r#"{"authenticatedUserCount":4,"anonymousUserCount":9}"#,
/// ).unwrap();
/// assert_eq!(c.total(), 13);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    /// Users connected with a valid session.
    pub authenticated_user_count: u64,
    /// Visitors connected without a session.
    pub anonymous_user_count: u64,
}

impl UserCounts {
    /// All connected users.
    pub fn total(&self) -> u64 {
        self.authenticated_user_count
            .saturating_add(self.anonymous_user_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_saturates() {
        let c = UserCounts {
            authenticated_user_count: u64::MAX,
            anonymous_user_count: 1,
        };
        assert_eq!(c.total(), u64::MAX);
    }

    #[test]
    fn missing_fields_are_malformed() {
        assert!(serde_json::from_str::<UserCounts>(r#"{"authenticatedUserCount":1}"#).is_err());
    }
}
