//! Gmail-backed reply detection.
//!
//! One messages.list probe per lead: `from:{email} after:{unix_ts}` with
//! `maxResults=1`. A non-zero `resultSizeEstimate` counts as a reply —
//! the engine never fetches message content.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{CollabError, ReplyDetector};

pub struct GmailReplyDetector {
    client: reqwest::Client,
    access_token: String,
}

impl GmailReplyDetector {
    pub fn new(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    result_size_estimate: u64,
}

#[async_trait]
impl ReplyDetector for GmailReplyDetector {
    async fn has_reply_since(
        &self,
        email: &str,
        after: DateTime<Utc>,
    ) -> Result<bool, CollabError> {
        let query = format!("from:{} after:{}", email, after.timestamp());
        let resp = self
            .client
            .get("https://gmail.googleapis.com/gmail/v1/users/me/messages")
            .bearer_auth(&self.access_token)
            .query(&[("q", query.as_str()), ("maxResults", "1")])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CollabError::AuthExpired);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CollabError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let list: MessageListResponse = resp.json().await?;
        Ok(list.result_size_estimate > 0)
    }
}
