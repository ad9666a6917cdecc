//! Slack Web API client.
//!
//! Implements [`PresenceClient`] over three methods: `users.list` (with
//! cursor pagination), `users.profile.set`, and `chat.postMessage`. Every
//! response carries an `ok` flag; `ok: false` surfaces the platform's
//! `error` string as [`PlatformError::Api`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PlatformError, PlatformUser, PresenceClient};

/// Slack Web API endpoint.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// HTTP timeout for a single API call.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Directory page size for `users.list`.
const USERS_PAGE_LIMIT: u32 = 200;

/// Slack Web API client.
///
/// Uses a reusable `reqwest::Client` with connection pooling and timeouts.
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: DEFAULT_SLACK_API_URL.to_string(),
            token: token.into(),
        }
    }

    /// Point the client at a different API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// POST a JSON payload to an API method and check the `ok` envelope.
    async fn call<T: Serialize + ?Sized>(
        &self,
        method: &'static str,
        payload: &T,
    ) -> Result<(), PlatformError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| PlatformError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::BadStatus(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlatformError::HttpError(e.to_string()))?;
        let ack: ApiResponse =
            serde_json::from_slice(&bytes).map_err(|e| PlatformError::JsonError(e.to_string()))?;

        if !ack.ok {
            return Err(PlatformError::Api {
                method,
                reason: ack.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }
}

impl PresenceClient for SlackClient {
    async fn list_users(&self) -> Result<Vec<PlatformUser>, PlatformError> {
        let url = format!("{}/users.list", self.base_url);
        let mut users = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[("limit", USERS_PAGE_LIMIT.to_string())]);
            if !cursor.is_empty() {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| PlatformError::HttpError(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PlatformError::BadStatus(status.as_u16()));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| PlatformError::HttpError(e.to_string()))?;
            let page: UsersListResponse = serde_json::from_slice(&bytes)
                .map_err(|e| PlatformError::JsonError(e.to_string()))?;

            if !page.ok {
                return Err(PlatformError::Api {
                    method: "users.list",
                    reason: page.error.unwrap_or_else(|| "unknown error".to_string()),
                });
            }

            users.extend(page.members.into_iter().map(PlatformUser::from));

            cursor = page
                .response_metadata
                .map(|m| m.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }

        debug!(count = users.len(), "user directory fetched");
        Ok(users)
    }

    async fn set_status(
        &self,
        user_id: &str,
        text: &str,
        emoji: &str,
        expires_at: i64,
    ) -> Result<(), PlatformError> {
        let payload = ProfileSetRequest {
            user: user_id,
            profile: StatusProfile {
                status_text: text,
                status_emoji: emoji,
                status_expiration: expires_at,
            },
        };
        self.call("users.profile.set", &payload).await
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), PlatformError> {
        let payload = PostMessageRequest {
            channel: channel_id,
            blocks: vec![Block {
                kind: "section",
                text: TextObject {
                    kind: "mrkdwn",
                    text,
                },
            }],
        };
        self.call("chat.postMessage", &payload).await
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct Member {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    real_name: String,
    #[serde(default)]
    profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
struct Profile {
    #[serde(default)]
    display_name: String,
}

impl From<Member> for PlatformUser {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            name: member.name,
            real_name: member.real_name,
            display_name: member.profile.display_name,
            deleted: member.deleted,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProfileSetRequest<'a> {
    user: &'a str,
    profile: StatusProfile<'a>,
}

#[derive(Debug, Serialize)]
struct StatusProfile<'a> {
    status_text: &'a str,
    status_emoji: &'a str,
    status_expiration: i64,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    blocks: Vec<Block<'a>>,
}

#[derive(Debug, Serialize)]
struct Block<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextObject<'a>,
}

#[derive(Debug, Serialize)]
struct TextObject<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_points_at_public_api_by_default() {
        let client = SlackClient::new("xoxb-test");
        assert_eq!(client.base_url, DEFAULT_SLACK_API_URL);
    }

    #[test]
    fn test_users_list_response_maps_members() {
        let json = r#"{
            "ok": true,
            "members": [
                {
                    "id": "U023BECGF",
                    "team_id": "T021F9ZE2",
                    "name": "maxm",
                    "deleted": false,
                    "real_name": "Max Muster HB9ABC",
                    "profile": {
                        "display_name": "max",
                        "status_text": "",
                        "status_emoji": ""
                    },
                    "is_admin": false
                },
                {
                    "id": "U0G9QF9C6",
                    "name": "gone",
                    "deleted": true,
                    "profile": {}
                }
            ],
            "response_metadata": {
                "next_cursor": "dXNlcjpVMEc5V0ZYTlo="
            }
        }"#;

        let page: UsersListResponse = serde_json::from_str(json).unwrap();
        assert!(page.ok);
        assert_eq!(
            page.response_metadata.unwrap().next_cursor,
            "dXNlcjpVMEc5V0ZYTlo="
        );

        let users: Vec<PlatformUser> = page.members.into_iter().map(PlatformUser::from).collect();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, "U023BECGF");
        assert_eq!(users[0].real_name, "Max Muster HB9ABC");
        assert_eq!(users[0].display_name, "max");
        assert!(!users[0].deleted);
        assert!(users[1].deleted);
        assert_eq!(users[1].real_name, "");
    }

    #[test]
    fn test_users_list_response_without_cursor() {
        let json = r#"{"ok": true, "members": []}"#;
        let page: UsersListResponse = serde_json::from_str(json).unwrap();
        assert!(page.response_metadata.is_none());
    }

    #[test]
    fn test_api_response_carries_rejection_reason() {
        let json = r#"{"ok": false, "error": "invalid_auth"}"#;
        let ack: ApiResponse = serde_json::from_str(json).unwrap();
        assert!(!ack.ok);
        assert_eq!(ack.error.as_deref(), Some("invalid_auth"));
    }

    #[test]
    fn test_profile_set_request_shape() {
        let payload = ProfileSetRequest {
            user: "U023BECGF",
            profile: StatusProfile {
                status_text: "on the road",
                status_emoji: ":car:",
                status_expiration: 1700000600,
            },
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["user"], "U023BECGF");
        assert_eq!(value["profile"]["status_text"], "on the road");
        assert_eq!(value["profile"]["status_emoji"], ":car:");
        assert_eq!(value["profile"]["status_expiration"], 1700000600);
    }

    #[test]
    fn test_post_message_request_builds_section_block() {
        let payload = PostMessageRequest {
            channel: "C12345",
            blocks: vec![Block {
                kind: "section",
                text: TextObject {
                    kind: "mrkdwn",
                    text: "HB9ABC via APRS: :car: on the road",
                },
            }],
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["channel"], "C12345");
        assert_eq!(value["blocks"][0]["type"], "section");
        assert_eq!(value["blocks"][0]["text"]["type"], "mrkdwn");
        assert_eq!(
            value["blocks"][0]["text"]["text"],
            "HB9ABC via APRS: :car: on the road"
        );
    }
}
