//! Error types for campaign-digest

use thiserror::Error;

/// Result type alias using campaign-digest's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for digest operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid required setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data returned by the row source violates an invariant
    #[error("Validation error: {0}")]
    Validation(String),

    /// Email building or SMTP delivery failure
    #[error("Email error: {0}")]
    Email(String),

    /// Slack rejected the message
    #[error("Slack error: {0}")]
    Slack(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an email error
    pub fn email(msg: impl Into<String>) -> Self {
        Self::Email(msg.into())
    }

    /// Create a Slack error
    pub fn slack(msg: impl Into<String>) -> Self {
        Self::Slack(msg.into())
    }
}
