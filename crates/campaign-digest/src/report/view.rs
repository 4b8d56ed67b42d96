//! Channel-neutral report structure
//!
//! Presenters never format numbers or pick headings themselves; they walk a
//! [`ReportView`] and serialize it into their own payload.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::{EngagementPolicy, Thresholds};
use crate::digest::Digest;
use crate::models::{AlertEntry, AlertKind};

/// Title shared by every channel
pub const REPORT_TITLE: &str = "Daily Campaign Alerts";

/// A digest laid out for presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    pub title: &'static str,
    pub business_date: NaiveDate,
    pub body: ReportBody,
}

/// What the report contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportBody {
    /// No client sent anything on the business date
    NoData,
    /// Totals and alert sections
    Summary {
        summary: Vec<SummaryLine>,
        sections: Vec<AlertSection>,
    },
}

/// One `label: value` line of the summary block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub label: &'static str,
    pub value: String,
}

impl SummaryLine {
    pub fn new(label: &'static str, value: impl ToString) -> Self {
        Self {
            label,
            value: value.to_string(),
        }
    }
}

/// One alert category with its listed clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSection {
    pub kind: AlertKind,
    pub heading: String,
    pub unit: &'static str,
    pub items: Vec<AlertItem>,
}

/// A listed client and its formatted metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertItem {
    pub client: String,
    pub value: String,
}

impl AlertSection {
    /// An empty section for `kind` titled according to `thresholds`
    pub fn new(kind: AlertKind, thresholds: &Thresholds) -> Self {
        let (heading, unit) = match (kind, thresholds.engagement) {
            (AlertKind::LowLeads, _) => (
                format!("Accounts with < {} New Leads Contacted", thresholds.low_leads),
                "Leads",
            ),
            (AlertKind::LowEngagement, EngagementPolicy::ReplyCount { at_most }) => {
                (format!("Accounts with ≤ {at_most} Replies"), "Replies")
            }
            (AlertKind::LowEngagement, EngagementPolicy::ReplyRate { below }) => (
                format!("Accounts with Reply Rate < {}", threshold_percent(below)),
                "Reply Rate",
            ),
            (AlertKind::ZeroPositive, _) => (
                "Accounts with 0 Positive Replies".to_string(),
                "Positive Replies",
            ),
        };

        Self {
            kind,
            heading,
            unit,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_entries(mut self, entries: &[AlertEntry]) -> Self {
        self.items.extend(entries.iter().map(|e| AlertItem {
            client: e.client.clone(),
            value: e.metric.to_string(),
        }));
        self
    }

    /// Icon shown next to the heading
    pub fn icon(&self) -> &'static str {
        match self.kind {
            AlertKind::LowLeads => "📉",
            AlertKind::LowEngagement => "🗨️",
            AlertKind::ZeroPositive => "🚨",
        }
    }

    /// `"<client>: <value> <unit>"` for every item
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.items
            .iter()
            .map(move |item| format!("{}: {} {}", item.client, item.value, self.unit))
    }
}

impl ReportView {
    /// Lay out `digest` for presentation
    pub fn from_digest(digest: &Digest, thresholds: &Thresholds) -> Self {
        let body = if digest.is_empty() {
            ReportBody::NoData
        } else {
            let totals = digest.totals();
            let summary = vec![
                SummaryLine::new("Total Emails Sent", totals.sent),
                SummaryLine::new("New Leads", totals.leads),
                SummaryLine::new("Replies", totals.replies),
                SummaryLine::new("Positive Replies", totals.positives),
                SummaryLine::new("Bounces", totals.bounces),
                SummaryLine::new("Reply Rate", digest.overall_reply_rate()),
                SummaryLine::new("Bounce Rate", digest.bounce_rate()),
            ];
            let sections = AlertKind::ALL
                .iter()
                .map(|&kind| {
                    AlertSection::new(kind, thresholds).with_entries(digest.alerts().get(kind))
                })
                .collect();
            ReportBody::Summary { summary, sections }
        };

        Self {
            title: REPORT_TITLE,
            business_date: digest.business_date(),
            body,
        }
    }

    /// `"Daily Campaign Alerts: 2024-03-14"`
    pub fn dated_title(&self) -> String {
        format!("{}: {}", self.title, self.business_date)
    }

    /// `"Summary for 2024-03-14"`
    pub fn summary_heading(&self) -> String {
        format!("Summary for {}", self.business_date)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.body, ReportBody::NoData)
    }
}

/// `0.01` -> `"1%"`, `0.025` -> `"2.5%"`
fn threshold_percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricRow;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    #[test]
    fn test_empty_digest_has_no_sections() {
        let thresholds = Thresholds::default();
        let digest = Digest::build(date(), &[], &thresholds).unwrap();
        let view = ReportView::from_digest(&digest, &thresholds);

        assert!(view.is_empty());
        assert_eq!(view.dated_title(), "Daily Campaign Alerts: 2024-03-14");
        assert_eq!(view.summary_heading(), "Summary for 2024-03-14");
    }

    #[test]
    fn test_summary_and_sections() {
        let thresholds = Thresholds::default();
        let rows = [
            MetricRow::new("C", 500, 100, 3, 0).with_bounces(5),
            MetricRow::new("A", 1000, 300, 50, 10),
        ];
        let digest = Digest::build(date(), &rows, &thresholds).unwrap();
        let view = ReportView::from_digest(&digest, &thresholds);

        let ReportBody::Summary { summary, sections } = view.body else {
            panic!("expected a summary body");
        };

        let summary: Vec<(&str, &str)> = summary
            .iter()
            .map(|l| (l.label, l.value.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Total Emails Sent", "1500"),
                ("New Leads", "400"),
                ("Replies", "53"),
                ("Positive Replies", "10"),
                ("Bounces", "5"),
                ("Reply Rate", "0.7%"),
                ("Bounce Rate", "0.3%"),
            ]
        );

        let headings: Vec<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(
            headings,
            vec![
                "Accounts with < 250 New Leads Contacted",
                "Accounts with ≤ 5 Replies",
                "Accounts with 0 Positive Replies",
            ]
        );
        assert_eq!(
            sections[0].lines().collect::<Vec<_>>(),
            vec!["C: 100 Leads".to_string()]
        );
        assert_eq!(
            sections[2].lines().collect::<Vec<_>>(),
            vec!["C: 0 Positive Replies".to_string()]
        );
    }

    #[test]
    fn test_rate_policy_heading() {
        let thresholds = Thresholds {
            engagement: EngagementPolicy::ReplyRate {
                below: Decimal::new(25, 3),
            },
            ..Thresholds::default()
        };
        let section = AlertSection::new(AlertKind::LowEngagement, &thresholds);

        assert_eq!(section.heading, "Accounts with Reply Rate < 2.5%");
        assert_eq!(section.unit, "Reply Rate");
    }
}
