//! Data models for campaign-digest

mod alert;
mod metrics;
mod rate;

pub use alert::*;
pub use metrics::*;
pub use rate::*;
