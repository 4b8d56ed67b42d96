//! Delivery of rendered digests
//!
//! Each publisher renders the digest with its channel's presenter and hands
//! the payload to the transport. There are no retries; a failed publish is
//! reported to the caller.

mod email;
mod preview;
mod slack;

pub use email::{connection_plan, EmailPublisher, SmtpAttempt, SmtpSecurity};
pub use preview::{render_preview, PreviewPublisher};
pub use slack::SlackPublisher;

use crate::config::{Channel, Thresholds};
use crate::digest::Digest;
use crate::error::Result;

/// Sends a digest over one channel
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Channel this publisher delivers to
    fn channel(&self) -> Channel;

    /// Render and deliver `digest`
    async fn publish(&self, digest: &Digest, thresholds: &Thresholds) -> Result<()>;
}
