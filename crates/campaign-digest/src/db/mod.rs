//! Row sources for campaign metrics
//!
//! Provides the Postgres reporting table reader and an in-memory source.

mod postgres;

pub use postgres::PostgresRowSource;

use std::path::Path;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::MetricRow;

/// Anything that can produce per-client metric rows for a business date
#[async_trait::async_trait]
pub trait RowSource: Send + Sync {
    /// Rows for `business_date`, already summed per client.
    ///
    /// No data is an empty vector, not an error.
    async fn fetch_rows(&self, business_date: NaiveDate) -> Result<Vec<MetricRow>>;

    /// Release any held connection
    async fn close(&self) {}
}

/// A fixed row set, e.g. loaded from a JSON export
#[derive(Debug, Clone, Default)]
pub struct StaticRowSource {
    rows: Vec<MetricRow>,
}

impl StaticRowSource {
    pub fn new(rows: Vec<MetricRow>) -> Self {
        Self { rows }
    }

    /// Load a JSON array of rows from `path`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&raw)?))
    }
}

#[async_trait::async_trait]
impl RowSource for StaticRowSource {
    async fn fetch_rows(&self, _business_date: NaiveDate) -> Result<Vec<MetricRow>> {
        Ok(self.rows.clone())
    }
}
