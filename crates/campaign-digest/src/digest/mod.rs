//! Digest computation
//!
//! A [`Digest`] is built once from a row set, read by exactly one presenter
//! and then dropped. It is never mutated after construction.

mod aggregator;
mod classifier;

pub use aggregator::aggregate;
pub use classifier::{classify, AlertLists};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::Thresholds;
use crate::error::Result;
use crate::models::{AlertEntry, AlertKind, MetricRow, Rate, RateBasis, Totals};

/// Immutable summary of one business day's campaign metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    business_date: NaiveDate,
    totals: Totals,
    rate_basis: RateBasis,
    overall_reply_rate: Rate,
    bounce_rate: Rate,
    alerts: AlertLists,
    active_clients: usize,
    inactive_clients: usize,
}

impl Digest {
    /// Build a digest from the rows returned for `business_date`.
    ///
    /// Rows with nothing sent are dropped before aggregation, whether or not
    /// the row source already filtered them. Totals that overflow `u64` are a
    /// validation error.
    pub fn build(
        business_date: NaiveDate,
        rows: &[MetricRow],
        thresholds: &Thresholds,
    ) -> Result<Self> {
        let (active, inactive): (Vec<&MetricRow>, Vec<&MetricRow>) =
            rows.iter().partition(|r| r.is_active());

        let totals = aggregate(active.iter().copied())?;
        let alerts = classify(active.iter().copied(), thresholds);

        debug!(
            %business_date,
            active = active.len(),
            inactive = inactive.len(),
            alerts = alerts.len(),
            "Built digest"
        );

        Ok(Self {
            business_date,
            totals,
            rate_basis: thresholds.rate_basis,
            overall_reply_rate: totals.reply_rate(thresholds.rate_basis),
            bounce_rate: totals.bounce_rate(),
            alerts,
            active_clients: active.len(),
            inactive_clients: inactive.len(),
        })
    }

    pub fn business_date(&self) -> NaiveDate {
        self.business_date
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Convention the overall reply rate was computed with
    pub fn rate_basis(&self) -> RateBasis {
        self.rate_basis
    }

    pub fn overall_reply_rate(&self) -> Rate {
        self.overall_reply_rate
    }

    pub fn bounce_rate(&self) -> Rate {
        self.bounce_rate
    }

    pub fn alerts(&self) -> &AlertLists {
        &self.alerts
    }

    pub fn low_leads(&self) -> &[AlertEntry] {
        self.alerts.get(AlertKind::LowLeads)
    }

    pub fn low_engagement(&self) -> &[AlertEntry] {
        self.alerts.get(AlertKind::LowEngagement)
    }

    pub fn zero_positive(&self) -> &[AlertEntry] {
        self.alerts.get(AlertKind::ZeroPositive)
    }

    /// Number of clients with something sent
    pub fn active_clients(&self) -> usize {
        self.active_clients
    }

    /// Number of rows dropped because nothing was sent
    pub fn inactive_clients(&self) -> usize {
        self.inactive_clients
    }

    /// Whether there was no campaign activity at all
    pub fn is_empty(&self) -> bool {
        self.active_clients == 0
    }
}
