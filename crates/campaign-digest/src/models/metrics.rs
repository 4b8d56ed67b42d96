//! Per-client metric rows and their totals

use serde::{Deserialize, Serialize};

use super::rate::{Rate, RateBasis};
use crate::error::{Error, Result};

/// One client's aggregated campaign metrics for the business date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Client the metrics are attributed to (may be empty for orphan rows)
    #[serde(default)]
    pub client_name: String,

    /// Emails sent
    #[serde(default)]
    pub sent: u64,

    /// New leads reached
    #[serde(default)]
    pub leads: u64,

    /// Replies received
    #[serde(default)]
    pub replies: u64,

    /// Positive replies received
    #[serde(default)]
    pub positives: u64,

    /// Bounced emails
    #[serde(default)]
    pub bounces: u64,
}

impl MetricRow {
    /// Create a row without bounces
    pub fn new(
        client_name: impl Into<String>,
        sent: u64,
        leads: u64,
        replies: u64,
        positives: u64,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            sent,
            leads,
            replies,
            positives,
            bounces: 0,
        }
    }

    /// Set the bounce count
    #[must_use]
    pub fn with_bounces(mut self, bounces: u64) -> Self {
        self.bounces = bounces;
        self
    }

    /// Whether the client sent anything on the business date
    pub fn is_active(&self) -> bool {
        self.sent > 0
    }

    /// Whether the row is attributed to a named client
    pub fn is_attributed(&self) -> bool {
        !self.client_name.trim().is_empty()
    }

    /// Reply rate of this row under the given basis
    pub fn reply_rate(&self, basis: RateBasis) -> Rate {
        basis.rate(self.positives, self.replies, self.sent, self.leads)
    }

    /// Bounces per email sent
    pub fn bounce_rate(&self) -> Rate {
        Rate::new(self.bounces, self.sent)
    }
}

/// Sums of every metric across a row set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub sent: u64,
    pub leads: u64,
    pub replies: u64,
    pub positives: u64,
    pub bounces: u64,
}

impl Totals {
    /// Add a row to the running totals.
    ///
    /// A sum that does not fit in `u64` is a validation error and leaves the
    /// totals untouched.
    pub fn add(&mut self, row: &MetricRow) -> Result<()> {
        let sum = |field: &str, total: u64, value: u64| {
            total.checked_add(value).ok_or_else(|| {
                Error::validation(format!(
                    "{field} total overflows adding client '{}'",
                    row.client_name
                ))
            })
        };

        *self = Self {
            sent: sum("sent", self.sent, row.sent)?,
            leads: sum("leads", self.leads, row.leads)?,
            replies: sum("replies", self.replies, row.replies)?,
            positives: sum("positives", self.positives, row.positives)?,
            bounces: sum("bounces", self.bounces, row.bounces)?,
        };
        Ok(())
    }

    /// Overall reply rate under the given basis
    pub fn reply_rate(&self, basis: RateBasis) -> Rate {
        basis.rate(self.positives, self.replies, self.sent, self.leads)
    }

    /// Overall bounces per email sent
    pub fn bounce_rate(&self) -> Rate {
        Rate::new(self.bounces, self.sent)
    }

    /// Whether every total is zero
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
