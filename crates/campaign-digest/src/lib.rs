//! # campaign-digest
//!
//! Daily campaign performance digest for email and Slack.
//!
//! Per-client metric rows for one business date are reduced into totals,
//! derived rates and threshold alert lists, then rendered per channel.
//!
//! ## Architecture
//!
//! - **Row source**: per-client sums from the Postgres reporting table
//! - **Digest**: aggregation and alert classification
//! - **Presenters**: HTML email and Slack Block Kit payloads
//! - **Publishers**: SMTP and Slack Web API delivery
//!
//! ## Quick Start
//!
//! ```bash
//! # Preview yesterday's email without sending it
//! campaign-digest email --dry-run
//!
//! # Send both channels
//! campaign-digest all
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod db;
pub mod digest;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod presenters;
pub mod publish;
pub mod report;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::{Channel, Config, Thresholds};
    pub use crate::db::{PostgresRowSource, RowSource, StaticRowSource};
    pub use crate::digest::Digest;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::pipeline::{DigestRun, RunSummary};
    pub use crate::publish::Publisher;
}
