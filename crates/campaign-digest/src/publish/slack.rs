//! Slack delivery through `chat.postMessage`

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Channel, SlackConfig, Thresholds};
use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::presenters::slack::{self as presenter, Block, SlackMessage};

use super::Publisher;

/// Posts the digest to a Slack channel as a bot
pub struct SlackPublisher {
    client: Client,
    config: SlackConfig,
}

impl SlackPublisher {
    /// Create a publisher whose requests time out after `timeout`
    pub fn new(config: SlackConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    /// Post a rendered message. A non-2xx status or `ok: false` is an error.
    pub async fn post(&self, message: &SlackMessage) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.config.api_url);
        let payload = PostMessage {
            channel: &self.config.channel_id,
            blocks: &message.blocks,
            text: &message.text,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::slack(format!("Slack returned {status}: {body}")));
        }

        let reply: PostMessageResponse = response.json().await?;
        if !reply.ok {
            return Err(Error::slack(format!(
                "chat.postMessage failed: {}",
                reply.error.as_deref().unwrap_or("unknown error")
            )));
        }

        info!(
            channel = %self.config.channel_id,
            ts = reply.ts.as_deref().unwrap_or_default(),
            blocks = message.blocks.len(),
            "Slack message posted"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Publisher for SlackPublisher {
    fn channel(&self) -> Channel {
        Channel::Slack
    }

    async fn publish(&self, digest: &Digest, thresholds: &Thresholds) -> Result<()> {
        let message = presenter::render(digest, thresholds);
        self.post(&message).await
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    blocks: &'a [Block],
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}
