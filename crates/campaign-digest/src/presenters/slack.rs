//! Slack Block Kit rendering
//!
//! Slack caps a message at 50 blocks, header text at 150 characters and
//! section text at 3000 characters. The layout here uses a fixed handful of
//! blocks, so only text lengths need enforcing: long alert lists keep whole
//! lines and end with an "…and N more" note.

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::digest::Digest;
use crate::report::{AlertSection, ReportBody, ReportView, SummaryLine};

pub const MAX_BLOCKS: usize = 50;
pub const MAX_HEADER_CHARS: usize = 150;
pub const MAX_SECTION_CHARS: usize = 3000;

const BULLET: &str = "•";

/// Text object inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PlainText { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

/// A Block Kit layout block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: Text },
    Section { text: Text },
    Divider,
}

/// A rendered chat message ready for the Slack publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    pub blocks: Vec<Block>,
    /// Notification fallback for clients that cannot show blocks
    pub text: String,
}

/// Render `digest` as Slack blocks
pub fn render(digest: &Digest, thresholds: &Thresholds) -> SlackMessage {
    let view = ReportView::from_digest(digest, thresholds);

    let mut blocks = vec![Block::Header {
        text: Text::plain(truncate_chars(
            &format!("📊 {}", view.dated_title()),
            MAX_HEADER_CHARS,
        )),
    }];

    let text = match &view.body {
        ReportBody::NoData => {
            blocks.push(Block::Section {
                text: Text::mrkdwn(format!(
                    "No campaign activity recorded for {}.",
                    view.business_date
                )),
            });
            format!("{}: no data", view.dated_title())
        }
        ReportBody::Summary { summary, sections } => {
            blocks.push(Block::Section {
                text: Text::mrkdwn(summary_text(&view.summary_heading(), summary)),
            });
            blocks.push(Block::Divider);
            for section in sections {
                blocks.push(Block::Section {
                    text: Text::mrkdwn(section_text(section)),
                });
            }
            let flagged: usize = sections.iter().map(|s| s.items.len()).sum();
            format!("{}: {flagged} alert(s)", view.dated_title())
        }
    };

    blocks.truncate(MAX_BLOCKS);
    SlackMessage { blocks, text }
}

fn summary_text(heading: &str, summary: &[SummaryLine]) -> String {
    let mut text = format!("*📊 {}*", escape_mrkdwn(heading));
    for line in summary {
        text.push('\n');
        text.push_str(&format!(
            "{BULLET} {}: {}",
            escape_mrkdwn(line.label),
            escape_mrkdwn(&line.value)
        ));
    }
    text
}

fn section_text(section: &AlertSection) -> String {
    let heading = format!("*{} {}*", section.icon(), escape_mrkdwn(&section.heading));

    if section.items.is_empty() {
        return format!("{heading}\n✅ None");
    }

    let lines: Vec<String> = section
        .items
        .iter()
        .map(|item| {
            format!(
                "{BULLET} *{}*: {} {}",
                escape_mrkdwn(&item.client),
                escape_mrkdwn(&item.value),
                section.unit
            )
        })
        .collect();

    fit_lines(&heading, &lines, MAX_SECTION_CHARS)
}

fn overflow_note(remaining: usize) -> String {
    format!("…and {remaining} more")
}

/// Join `heading` and as many whole `lines` as fit in `limit` characters,
/// noting how many were left out
fn fit_lines(heading: &str, lines: &[String], limit: usize) -> String {
    let mut text = heading.to_string();
    let mut used = text.chars().count();

    for (i, line) in lines.iter().enumerate() {
        let line_len = 1 + line.chars().count();
        let rest = lines.len() - i - 1;
        let note_len = if rest == 0 {
            0
        } else {
            1 + overflow_note(rest).chars().count()
        };

        if used + line_len + note_len > limit {
            text.push('\n');
            text.push_str(&overflow_note(lines.len() - i));
            return text;
        }

        text.push('\n');
        text.push_str(line);
        used += line_len;
    }

    text
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// Escape the three characters Slack treats as control sequences
pub fn escape_mrkdwn(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
