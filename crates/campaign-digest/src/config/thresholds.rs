//! Alert thresholds and lenient parsing of decorated numeric settings

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::RateBasis;

/// Default minimum number of new leads per client
pub const DEFAULT_LOW_LEADS: u64 = 250;

/// Default reply count at or under which a client is flagged
pub const DEFAULT_LOW_REPLY_COUNT: u64 = 5;

/// Default reply rate (1%) under which a client is flagged
pub const DEFAULT_LOW_REPLY_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

// Digit groups must be exactly three wide: "1,000" and "12,500" but not "1,00".
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d{1,3}(?:,\d{3})+\b(?:\.\d+)?|-?\d+(?:\.\d+)?")
        .expect("number pattern is valid")
});

/// How low engagement is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementPolicy {
    /// `replies <= at_most`
    ReplyCount { at_most: u64 },
    /// `reply_rate < below`
    ReplyRate { below: Decimal },
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self::ReplyCount {
            at_most: DEFAULT_LOW_REPLY_COUNT,
        }
    }
}

/// Thresholds and conventions applied by the alert classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Clients with strictly fewer leads are flagged
    pub low_leads: u64,

    /// Low engagement policy
    pub engagement: EngagementPolicy,

    /// Reply rate convention for the summary and the rate policy
    pub rate_basis: RateBasis,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_leads: DEFAULT_LOW_LEADS,
            engagement: EngagementPolicy::default(),
            rate_basis: RateBasis::default(),
        }
    }
}

impl Thresholds {
    /// Read thresholds from environment-style settings.
    ///
    /// Malformed numbers fall back to their defaults with a warning. An
    /// unknown policy or rate basis name is a configuration error.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let low_leads = parse_count(
            "LOW_LEADS_THRESHOLD",
            lookup("LOW_LEADS_THRESHOLD").as_deref(),
            DEFAULT_LOW_LEADS,
        );

        let policy = lookup("LOW_ENGAGEMENT_POLICY")
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        let engagement = match policy.as_deref() {
            None | Some("count") => EngagementPolicy::ReplyCount {
                at_most: parse_count(
                    "LOW_REPLY_COUNT_THRESHOLD",
                    lookup("LOW_REPLY_COUNT_THRESHOLD").as_deref(),
                    DEFAULT_LOW_REPLY_COUNT,
                ),
            },
            Some("rate") => EngagementPolicy::ReplyRate {
                below: parse_rate(
                    "LOW_REPLY_RATE_THRESHOLD",
                    lookup("LOW_REPLY_RATE_THRESHOLD").as_deref(),
                    DEFAULT_LOW_REPLY_RATE,
                ),
            },
            Some(other) => {
                return Err(Error::config(format!(
                    "LOW_ENGAGEMENT_POLICY must be 'count' or 'rate', got '{other}'"
                )))
            }
        };

        let rate_basis = match lookup("REPLY_RATE_BASIS").filter(|v| !v.trim().is_empty()) {
            Some(raw) => RateBasis::from_str(&raw)
                .map_err(|e| Error::config(format!("REPLY_RATE_BASIS: {e}")))?,
            None => RateBasis::default(),
        };

        Ok(Self {
            low_leads,
            engagement,
            rate_basis,
        })
    }
}

/// Parse a count threshold, falling back to `default` on malformed input
pub fn parse_count(key: &str, raw: Option<&str>, default: u64) -> u64 {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return default;
    };

    match extract_count(raw) {
        Some(value) => value,
        None => {
            warn!(key, value = raw, default, "Malformed count threshold, using default");
            default
        }
    }
}

/// Parse a rate threshold, falling back to `default` on malformed input
pub fn parse_rate(key: &str, raw: Option<&str>, default: Decimal) -> Decimal {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return default;
    };

    match extract_rate(raw) {
        Some(value) => value,
        None => {
            warn!(key, value = raw, default = %default, "Malformed rate threshold, using default");
            default
        }
    }
}

fn extract_number(raw: &str) -> Option<Decimal> {
    let found = NUMBER.find(raw)?;

    // A match that stops at a comma is a mangled grouping like "1,00"
    let rest = &raw[found.end()..];
    if rest.starts_with(',') && rest[1..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let value = Decimal::from_str(&found.as_str().replace(',', "")).ok()?;
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    Some(value.abs())
}

/// `"250"`, `"250.0"` and `"250 leads"` all give 250
fn extract_count(raw: &str) -> Option<u64> {
    let value = extract_number(raw)?;
    if !value.fract().is_zero() {
        return None;
    }
    value.to_u64()
}

/// `"0.01"`, `"1%"` and `"1.0 %"` all give 0.01
fn extract_rate(raw: &str) -> Option<Decimal> {
    let value = extract_number(raw)?;
    let rate = if raw.contains('%') {
        value / Decimal::ONE_HUNDRED
    } else {
        value
    };
    if rate > Decimal::ONE {
        return None;
    }
    Some(rate.normalize())
}
