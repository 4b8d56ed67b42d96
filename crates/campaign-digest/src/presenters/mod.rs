//! Presenters: pure functions turning a digest into a channel payload

pub mod email;
pub mod slack;

pub use email::EmailDocument;
pub use slack::{Block, SlackMessage, Text};
