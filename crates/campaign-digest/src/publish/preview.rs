//! Dry-run rendering to stdout

use std::io::Write;

use serde_json::json;

use crate::config::{Channel, Thresholds};
use crate::digest::Digest;
use crate::error::Result;
use crate::presenters::{email, slack};

use super::Publisher;

/// Render the payload `channel` would send, as text
pub fn render_preview(
    channel: Channel,
    digest: &Digest,
    thresholds: &Thresholds,
) -> Result<String> {
    match channel {
        Channel::Email => {
            let document = email::render(digest, thresholds);
            Ok(format!(
                "Subject: {}\n\n{}\n--- plain text ---\n{}",
                document.subject, document.html, document.text
            ))
        }
        Channel::Slack => {
            let message = slack::render(digest, thresholds);
            Ok(serde_json::to_string_pretty(&json!({
                "blocks": message.blocks,
                "text": message.text,
            }))?)
        }
    }
}

/// Prints the payload instead of sending it
pub struct PreviewPublisher {
    channel: Channel,
}

impl PreviewPublisher {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait::async_trait]
impl Publisher for PreviewPublisher {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn publish(&self, digest: &Digest, thresholds: &Thresholds) -> Result<()> {
        let rendered = render_preview(self.channel, digest, thresholds)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{rendered}")?;
        Ok(())
    }
}
