//! Alert data models

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::rate::Rate;

/// Category of threshold violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Fewer new leads reached than the configured minimum
    LowLeads,
    /// Reply count or reply rate at or under the engagement threshold
    LowEngagement,
    /// No positive replies at all
    ZeroPositive,
}

impl AlertKind {
    /// All categories in presentation order
    pub const ALL: [AlertKind; 3] = [Self::LowLeads, Self::LowEngagement, Self::ZeroPositive];
}

/// The value that triggered an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum AlertMetric {
    /// An absolute count
    Count(u64),
    /// A ratio
    Rate(Rate),
}

impl AlertMetric {
    /// Order by numeric value, counts before rates when mixed
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Count(a), Self::Count(b)) => a.cmp(b),
            (Self::Rate(a), Self::Rate(b)) => a.cmp_value(b),
            (Self::Count(_), Self::Rate(_)) => Ordering::Less,
            (Self::Rate(_), Self::Count(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for AlertMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Rate(rate) => write!(f, "{rate}"),
        }
    }
}

/// A single client listed under an alert category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEntry {
    /// Client name (never empty)
    pub client: String,
    /// Metric that triggered the alert
    pub metric: AlertMetric,
}

impl AlertEntry {
    pub fn count(client: impl Into<String>, value: u64) -> Self {
        Self {
            client: client.into(),
            metric: AlertMetric::Count(value),
        }
    }

    pub fn rate(client: impl Into<String>, value: Rate) -> Self {
        Self {
            client: client.into(),
            metric: AlertMetric::Rate(value),
        }
    }

    /// Worst-first ordering: metric ascending, then client name ascending
    pub fn worst_first(&self, other: &Self) -> Ordering {
        self.metric
            .cmp_value(&other.metric)
            .then_with(|| self.client.cmp(&other.client))
    }
}
