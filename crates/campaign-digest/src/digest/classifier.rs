//! Alert classification
//!
//! Partitions clients into the three threshold-violation lists. A client can
//! appear in any number of lists; rows without a client name never appear.
//! Every list is sorted worst first: triggering metric ascending, then client
//! name ascending (case-sensitive).

use serde::{Deserialize, Serialize};

use crate::config::{EngagementPolicy, Thresholds};
use crate::models::{AlertEntry, AlertKind, MetricRow};

/// The three alert lists derived from one row set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLists {
    pub low_leads: Vec<AlertEntry>,
    pub low_engagement: Vec<AlertEntry>,
    pub zero_positive: Vec<AlertEntry>,
}

impl AlertLists {
    /// Entries for one category
    pub fn get(&self, kind: AlertKind) -> &[AlertEntry] {
        match kind {
            AlertKind::LowLeads => &self.low_leads,
            AlertKind::LowEngagement => &self.low_engagement,
            AlertKind::ZeroPositive => &self.zero_positive,
        }
    }

    /// Total number of entries across all categories
    pub fn len(&self) -> usize {
        self.low_leads.len() + self.low_engagement.len() + self.zero_positive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify `rows` against `thresholds`
pub fn classify<'a>(
    rows: impl IntoIterator<Item = &'a MetricRow>,
    thresholds: &Thresholds,
) -> AlertLists {
    let mut lists = AlertLists::default();

    for row in rows.into_iter().filter(|r| r.is_attributed()) {
        if let Some(entry) = low_leads(row, thresholds.low_leads) {
            lists.low_leads.push(entry);
        }
        if let Some(entry) = low_engagement(row, thresholds) {
            lists.low_engagement.push(entry);
        }
        if row.positives == 0 {
            lists.zero_positive.push(AlertEntry::count(&row.client_name, 0));
        }
    }

    lists.low_leads.sort_by(AlertEntry::worst_first);
    lists.low_engagement.sort_by(AlertEntry::worst_first);
    lists.zero_positive.sort_by(AlertEntry::worst_first);

    lists
}

fn low_leads(row: &MetricRow, threshold: u64) -> Option<AlertEntry> {
    (row.leads < threshold).then(|| AlertEntry::count(&row.client_name, row.leads))
}

fn low_engagement(row: &MetricRow, thresholds: &Thresholds) -> Option<AlertEntry> {
    match thresholds.engagement {
        EngagementPolicy::ReplyCount { at_most } => (row.replies <= at_most)
            .then(|| AlertEntry::count(&row.client_name, row.replies)),
        EngagementPolicy::ReplyRate { below } => {
            let rate = row.reply_rate(thresholds.rate_basis);
            rate.is_below(below)
                .then(|| AlertEntry::rate(&row.client_name, rate))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertMetric, Rate, RateBasis};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn names(entries: &[AlertEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.client.as_str()).collect()
    }

    #[test]
    fn test_single_failing_client_hits_every_list() {
        let rows = [MetricRow::new("C", 500, 100, 3, 0)];
        let lists = classify(&rows, &Thresholds::default());

        assert_eq!(lists.low_leads, vec![AlertEntry::count("C", 100)]);
        assert_eq!(lists.low_engagement, vec![AlertEntry::count("C", 3)]);
        assert_eq!(lists.zero_positive, vec![AlertEntry::count("C", 0)]);
        assert_eq!(lists.len(), 3);
    }

    #[test]
    fn test_healthy_client_is_not_listed() {
        let rows = [MetricRow::new("A", 1000, 300, 50, 10)];
        assert!(classify(&rows, &Thresholds::default()).is_empty());
    }

    #[test]
    fn test_boundaries() {
        let rows = [
            MetricRow::new("AtLeadThreshold", 10, 250, 6, 1),
            MetricRow::new("BelowLeadThreshold", 10, 249, 6, 1),
            MetricRow::new("AtReplyThreshold", 10, 300, 5, 1),
        ];
        let lists = classify(&rows, &Thresholds::default());

        assert_eq!(names(&lists.low_leads), vec!["BelowLeadThreshold"]);
        assert_eq!(names(&lists.low_engagement), vec!["AtReplyThreshold"]);
        assert!(lists.zero_positive.is_empty());
    }

    #[test]
    fn test_unnamed_rows_are_never_listed() {
        let rows = [
            MetricRow::new("", 10, 0, 0, 0),
            MetricRow::new("  ", 10, 0, 0, 0),
            MetricRow::new("Named", 10, 0, 0, 0),
        ];
        let lists = classify(&rows, &Thresholds::default());

        assert_eq!(names(&lists.low_leads), vec!["Named"]);
        assert_eq!(names(&lists.low_engagement), vec!["Named"]);
        assert_eq!(names(&lists.zero_positive), vec!["Named"]);
    }

    #[test]
    fn test_sorted_worst_first_then_by_name() {
        let rows = [
            MetricRow::new("delta", 10, 200, 9, 1),
            MetricRow::new("Bravo", 10, 100, 9, 0),
            MetricRow::new("alpha", 10, 100, 9, 0),
            MetricRow::new("Charlie", 10, 5, 9, 0),
        ];
        let lists = classify(&rows, &Thresholds::default());

        assert_eq!(
            names(&lists.low_leads),
            vec!["Charlie", "Bravo", "alpha", "delta"]
        );
        assert_eq!(names(&lists.zero_positive), vec!["Bravo", "Charlie", "alpha"]);
    }

    #[test]
    fn test_rate_policy_uses_configured_basis() {
        let thresholds = Thresholds {
            engagement: EngagementPolicy::ReplyRate {
                below: Decimal::new(1, 2),
            },
            rate_basis: RateBasis::PositivesPerSent,
            ..Thresholds::default()
        };
        let rows = [
            MetricRow::new("Low", 1000, 300, 40, 5),
            MetricRow::new("Lower", 1000, 300, 40, 2),
            MetricRow::new("Fine", 1000, 300, 1, 10),
        ];
        let lists = classify(&rows, &thresholds);

        assert_eq!(
            lists.low_engagement,
            vec![
                AlertEntry::rate("Lower", Rate::new(2, 1000)),
                AlertEntry::rate("Low", Rate::new(5, 1000)),
            ]
        );

        let by_leads = Thresholds {
            rate_basis: RateBasis::RepliesPerLeads,
            ..thresholds
        };
        let lists = classify(&rows, &by_leads);
        assert_eq!(names(&lists.low_engagement), vec!["Fine"]);
        assert_eq!(
            lists.low_engagement[0].metric,
            AlertMetric::Rate(Rate::new(1, 300))
        );
    }

    fn row_strategy() -> impl Strategy<Value = MetricRow> {
        ("[A-Da-d ]{0,3}", 0u64..50, 0u64..400, 0u64..10, 0u64..3).prop_map(
            |(name, sent, leads, replies, positives)| {
                MetricRow::new(name, sent, leads, replies, positives)
            },
        )
    }

    proptest! {
        #[test]
        fn prop_membership_matches_predicates(rows in prop::collection::vec(row_strategy(), 0..30)) {
            let thresholds = Thresholds::default();
            let lists = classify(&rows, &thresholds);
            let named: Vec<&MetricRow> = rows.iter().filter(|r| r.is_attributed()).collect();

            prop_assert_eq!(
                lists.low_leads.len(),
                named.iter().filter(|r| r.leads < thresholds.low_leads).count()
            );
            prop_assert_eq!(
                lists.low_engagement.len(),
                named.iter().filter(|r| r.replies <= 5).count()
            );
            prop_assert_eq!(
                lists.zero_positive.len(),
                named.iter().filter(|r| r.positives == 0).count()
            );
            for entry in &lists.low_leads {
                prop_assert!(!entry.client.trim().is_empty());
                prop_assert!(matches!(entry.metric, AlertMetric::Count(n) if n < 250));
            }
        }

        #[test]
        fn prop_order_is_stable_under_reordering(
            rows in prop::collection::vec(row_strategy(), 0..30),
            seed in any::<u64>(),
        ) {
            let mut shuffled = rows.clone();
            let len = shuffled.len();
            if len > 1 {
                shuffled.rotate_left((seed as usize) % len);
                shuffled.reverse();
            }

            let thresholds = Thresholds::default();
            prop_assert_eq!(classify(&rows, &thresholds), classify(&shuffled, &thresholds));
        }
    }
}
