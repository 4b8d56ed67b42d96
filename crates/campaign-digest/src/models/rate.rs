//! Exact ratios and the reply-rate conventions

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An exact `numerator / denominator` ratio.
///
/// A zero denominator means the rate is exactly zero, whatever the numerator.
/// The value stays a fraction until it is formatted, so scaling to a
/// percentage never accumulates floating point drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    numerator: u64,
    denominator: u64,
}

impl Rate {
    /// Create a new rate
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// The zero rate
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// Whether the rate evaluates to zero
    pub fn is_zero(&self) -> bool {
        self.numerator == 0 || self.denominator == 0
    }

    /// Numerator and denominator with the zero-denominator case normalised to 0/1
    fn normalized(self) -> (u128, u128) {
        if self.denominator == 0 {
            (0, 1)
        } else {
            (u128::from(self.numerator), u128::from(self.denominator))
        }
    }

    /// Compare two rates by value using cross multiplication
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        let (a, b) = self.normalized();
        let (c, d) = other.normalized();
        (a * d).cmp(&(c * b))
    }

    /// Whether the rate is strictly below a fractional threshold
    pub fn is_below(&self, threshold: Decimal) -> bool {
        let (n, d) = if self.denominator == 0 {
            (0, 1)
        } else {
            (self.numerator, self.denominator)
        };
        let n = Decimal::from(n);
        match threshold.checked_mul(Decimal::from(d)) {
            Some(limit) => n < limit,
            None => true,
        }
    }

    /// Percentage rounded half away from zero to one decimal place
    pub fn percent(&self) -> Decimal {
        if self.denominator == 0 {
            return Decimal::new(0, 1);
        }
        let hundred = Decimal::ONE_HUNDRED;
        let mut pct = (Decimal::from(self.numerator) * hundred / Decimal::from(self.denominator))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        pct.rescale(1);
        pct
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::zero()
    }
}

/// Formats as a one-decimal percentage, e.g. `12.3%`
impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Which counts make up a reply rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBasis {
    /// Positive replies per email sent
    #[default]
    PositivesPerSent,
    /// Replies per new lead reached
    RepliesPerLeads,
}

impl RateBasis {
    /// Build the rate from the raw counts
    pub fn rate(self, positives: u64, replies: u64, sent: u64, leads: u64) -> Rate {
        match self {
            Self::PositivesPerSent => Rate::new(positives, sent),
            Self::RepliesPerLeads => Rate::new(replies, leads),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PositivesPerSent => "positives_per_sent",
            Self::RepliesPerLeads => "replies_per_leads",
        }
    }
}

impl fmt::Display for RateBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "positives_per_sent" => Ok(Self::PositivesPerSent),
            "replies_per_leads" => Ok(Self::RepliesPerLeads),
            other => Err(format!(
                "unknown reply rate basis '{other}' (expected positives_per_sent or replies_per_leads)"
            )),
        }
    }
}
