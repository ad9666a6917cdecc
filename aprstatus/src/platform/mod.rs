//! Presence platform abstraction.
//!
//! The [`PresenceClient`] trait covers the three operations the pipeline
//! needs from the platform: listing the user directory, setting a user's
//! custom status, and posting to a broadcast channel. [`SlackClient`] is the
//! production implementation; tests use the recording mock from
//! [`tests::MockPresenceClient`].

mod slack;

use std::future::Future;

use thiserror::Error;

pub use slack::{SlackClient, DEFAULT_SLACK_API_URL};

/// Errors from presence platform calls.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// The platform answered with a non-success status code.
    #[error("platform returned HTTP {0}")]
    BadStatus(u16),

    /// JSON deserialization failed.
    #[error("failed to parse platform response: {0}")]
    JsonError(String),

    /// The platform acknowledged the call but rejected it.
    #[error("{method} rejected: {reason}")]
    Api {
        method: &'static str,
        reason: String,
    },
}

/// Credentials for the presence platform.
#[derive(Debug, Clone, Default)]
pub struct PlatformConfig {
    /// Bearer token for API calls.
    pub token: String,
}

impl PlatformConfig {
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }
}

/// A user as listed by the platform's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformUser {
    /// Platform identifier, the handle for status calls.
    pub id: String,
    /// Account name.
    pub name: String,
    /// Full ("real") name; the primary field for callsign matching.
    pub real_name: String,
    /// Profile display name; the secondary field for callsign matching.
    pub display_name: String,
    /// Deactivated accounts stay in the listing but are skipped.
    pub deleted: bool,
}

impl PlatformUser {
    /// Name to show in logs and records: the real name when present,
    /// the account name otherwise.
    pub fn preferred_name(&self) -> &str {
        if self.real_name.is_empty() {
            &self.name
        } else {
            &self.real_name
        }
    }
}

/// Operations the pipeline needs from the presence platform.
pub trait PresenceClient: Send + Sync {
    /// Fetch the full user directory.
    fn list_users(&self) -> impl Future<Output = Result<Vec<PlatformUser>, PlatformError>> + Send;

    /// Set a user's custom status with an expiration Unix timestamp.
    fn set_status(
        &self,
        user_id: &str,
        text: &str,
        emoji: &str,
        expires_at: i64,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Post a message to a channel.
    fn post_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A recorded `set_status` call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StatusCall {
        pub user_id: String,
        pub text: String,
        pub emoji: String,
        pub expires_at: i64,
    }

    /// A recorded `post_message` call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PostCall {
        pub channel: String,
        pub text: String,
    }

    /// Mock platform client serving a scripted directory and recording every
    /// mutating call.
    #[derive(Default)]
    pub struct MockPresenceClient {
        users: Mutex<Vec<PlatformUser>>,
        pub fail_list: bool,
        pub fail_status: bool,
        pub fail_post: bool,
        status_calls: Mutex<Vec<StatusCall>>,
        post_calls: Mutex<Vec<PostCall>>,
    }

    impl MockPresenceClient {
        pub fn with_users(users: Vec<PlatformUser>) -> Self {
            Self {
                users: Mutex::new(users),
                ..Self::default()
            }
        }

        /// Replace the directory served by `list_users`.
        pub fn set_users(&self, users: Vec<PlatformUser>) {
            *self.users.lock().unwrap() = users;
        }

        pub fn failing_listing() -> Self {
            Self {
                fail_list: true,
                ..Self::default()
            }
        }

        pub fn failing_status(mut self) -> Self {
            self.fail_status = true;
            self
        }

        pub fn failing_post(mut self) -> Self {
            self.fail_post = true;
            self
        }

        pub fn status_calls(&self) -> Vec<StatusCall> {
            self.status_calls.lock().unwrap().clone()
        }

        pub fn post_calls(&self) -> Vec<PostCall> {
            self.post_calls.lock().unwrap().clone()
        }
    }

    impl PresenceClient for MockPresenceClient {
        async fn list_users(&self) -> Result<Vec<PlatformUser>, PlatformError> {
            if self.fail_list {
                return Err(PlatformError::HttpError("connection refused".to_string()));
            }
            Ok(self.users.lock().unwrap().clone())
        }

        async fn set_status(
            &self,
            user_id: &str,
            text: &str,
            emoji: &str,
            expires_at: i64,
        ) -> Result<(), PlatformError> {
            self.status_calls.lock().unwrap().push(StatusCall {
                user_id: user_id.to_string(),
                text: text.to_string(),
                emoji: emoji.to_string(),
                expires_at,
            });
            if self.fail_status {
                return Err(PlatformError::Api {
                    method: "users.profile.set",
                    reason: "mock failure".to_string(),
                });
            }
            Ok(())
        }

        async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), PlatformError> {
            self.post_calls.lock().unwrap().push(PostCall {
                channel: channel_id.to_string(),
                text: text.to_string(),
            });
            if self.fail_post {
                return Err(PlatformError::Api {
                    method: "chat.postMessage",
                    reason: "mock failure".to_string(),
                });
            }
            Ok(())
        }
    }

    /// Directory entry for tests.
    pub fn platform_user(id: &str, real_name: &str, display_name: &str) -> PlatformUser {
        PlatformUser {
            id: id.to_string(),
            name: id.to_lowercase(),
            real_name: real_name.to_string(),
            display_name: display_name.to_string(),
            deleted: false,
        }
    }

    #[test]
    fn test_preferred_name_falls_back_to_account_name() {
        let mut user = platform_user("U1", "Max Muster", "");
        assert_eq!(user.preferred_name(), "Max Muster");

        user.real_name.clear();
        assert_eq!(user.preferred_name(), "u1");
    }

    #[tokio::test]
    async fn test_mock_records_status_calls() {
        let mock = MockPresenceClient::default();
        mock.set_status("U1", "on the road", ":car:", 1234).await.unwrap();

        let calls = mock.status_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user_id, "U1");
        assert_eq!(calls[0].emoji, ":car:");
    }
}
