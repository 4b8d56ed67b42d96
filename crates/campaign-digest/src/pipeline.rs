//! One-shot digest run: fetch, build, publish
//!
//! Data flows strictly forward. The row set is fetched once, the row source
//! is closed on every path, and each publisher gets a digest of its own.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};

use crate::config::{Channel, Thresholds};
use crate::db::RowSource;
use crate::digest::Digest;
use crate::error::Result;
use crate::models::MetricRow;
use crate::publish::Publisher;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub business_date: NaiveDate,
    pub rows: usize,
    pub alerts: usize,
    pub published: Vec<Channel>,
}

/// Wires a row source to a set of publishers
pub struct DigestRun<'a> {
    source: &'a dyn RowSource,
    thresholds: &'a Thresholds,
}

impl<'a> DigestRun<'a> {
    pub fn new(source: &'a dyn RowSource, thresholds: &'a Thresholds) -> Self {
        Self { source, thresholds }
    }

    /// Fetch rows and release the source, whatever the outcome
    async fn fetch(&self, business_date: NaiveDate) -> Result<Vec<MetricRow>> {
        let fetched = self.source.fetch_rows(business_date).await;
        self.source.close().await;
        fetched
    }

    /// Run the pipeline for `business_date`.
    ///
    /// Stops at the first publisher failure; nothing is retried.
    pub async fn execute(
        &self,
        business_date: NaiveDate,
        publishers: &[Box<dyn Publisher>],
    ) -> Result<RunSummary> {
        let rows = self.fetch(business_date).await?;
        info!(%business_date, rows = rows.len(), "Building digest");

        let mut summary = RunSummary {
            business_date,
            rows: rows.len(),
            alerts: 0,
            published: Vec::with_capacity(publishers.len()),
        };

        for publisher in publishers {
            let digest = Digest::build(business_date, &rows, self.thresholds)?;
            summary.alerts = digest.alerts().len();

            if let Err(e) = publisher.publish(&digest, self.thresholds).await {
                error!(channel = %publisher.channel(), error = %e, "Publish failed");
                return Err(e);
            }

            info!(channel = %publisher.channel(), "Digest published");
            summary.published.push(publisher.channel());
        }

        Ok(summary)
    }
}
