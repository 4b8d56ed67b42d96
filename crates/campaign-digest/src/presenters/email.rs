//! HTML email rendering

use std::fmt::Write;

use serde::Serialize;

use crate::config::Thresholds;
use crate::digest::Digest;
use crate::report::{AlertSection, ReportBody, ReportView, SummaryLine};

const WRAPPER_STYLE: &str =
    "font-family:Arial,sans-serif;color:#333;max-width:600px;margin:0 auto;line-height:1.6;";
const HEADER_STYLE: &str = "background:#0052CC;color:#fff;padding:16px;border-radius:4px;";
const LIST_STYLE: &str = "padding-left:20px;margin:0;font-size:14px;line-height:1.6;";
const FOOTER: &str = "Automated notification, please do not reply.";

/// A rendered email ready for the SMTP publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailDocument {
    pub subject: String,
    pub html: String,
    /// Plain-text alternative for clients that do not render HTML
    pub text: String,
}

/// Render `digest` as an email
pub fn render(digest: &Digest, thresholds: &Thresholds) -> EmailDocument {
    let view = ReportView::from_digest(digest, thresholds);

    EmailDocument {
        subject: format!("⚠️ {}", view.dated_title()),
        html: render_html(&view),
        text: render_text(&view),
    }
}

fn render_html(view: &ReportView) -> String {
    let mut html = String::new();

    let _ = writeln!(html, r#"<div style="{WRAPPER_STYLE}">"#);
    let _ = writeln!(html, r#"  <div style="{HEADER_STYLE}">"#);
    let _ = writeln!(
        html,
        r#"    <h2 style="margin:0;font-size:20px;">⚠️ {}</h2>"#,
        escape_html(view.title)
    );
    let _ = writeln!(
        html,
        r#"    <p style="margin:4px 0 0;font-size:14px;"><strong>Date:</strong> {}</p>"#,
        view.business_date
    );
    html.push_str("  </div>\n");

    match &view.body {
        ReportBody::NoData => {
            let _ = writeln!(
                html,
                r#"  <p style="font-size:14px;margin-top:12px;">No data for {}.</p>"#,
                view.business_date
            );
        }
        ReportBody::Summary { summary, sections } => {
            render_summary(&mut html, &view.summary_heading(), summary);
            for section in sections {
                render_section(&mut html, section);
            }
        }
    }

    let _ = writeln!(
        html,
        r#"  <p style="font-size:12px;color:#666;margin-top:12px;">{FOOTER}</p>"#
    );
    html.push_str("</div>\n");
    html
}

fn render_summary(html: &mut String, heading: &str, summary: &[SummaryLine]) {
    html.push_str(
        r#"  <div style="padding:16px;background:#f0f4ff;border-radius:4px;margin-top:8px;">"#,
    );
    html.push('\n');
    let _ = writeln!(
        html,
        r#"    <h3 style="margin:0 0 8px;font-size:16px;">📊 {}</h3>"#,
        escape_html(heading)
    );
    let _ = writeln!(html, r#"    <ul style="{LIST_STYLE}">"#);
    for line in summary {
        let _ = writeln!(
            html,
            "      <li>{}: {}</li>",
            escape_html(line.label),
            escape_html(&line.value)
        );
    }
    html.push_str("    </ul>\n  </div>\n");
}

fn section_colors(section: &AlertSection) -> (&'static str, &'static str) {
    use crate::models::AlertKind;

    match section.kind {
        AlertKind::LowLeads => ("#fff3cd", "#856404"),
        AlertKind::LowEngagement => ("#f1dfd1", "#602f0c"),
        AlertKind::ZeroPositive => ("#f8d7da", "#721c24"),
    }
}

fn render_section(html: &mut String, section: &AlertSection) {
    let (background, color) = section_colors(section);

    let _ = writeln!(
        html,
        r#"  <div style="padding:16px;background:{background};border-radius:4px;margin-top:12px;">"#
    );
    let _ = writeln!(
        html,
        r#"    <h3 style="margin:0 0 8px;font-size:16px;color:{color};">{} {}</h3>"#,
        section.icon(),
        escape_html(&section.heading)
    );

    if section.items.is_empty() {
        html.push_str(r#"    <p style="font-size:14px;margin:0 0 8px;">✅ None</p>"#);
        html.push('\n');
    } else {
        let _ = writeln!(html, r#"    <ul style="{LIST_STYLE}">"#);
        for item in &section.items {
            let _ = writeln!(
                html,
                "      <li><strong>{}</strong>: {} {}</li>",
                escape_html(&item.client),
                escape_html(&item.value),
                escape_html(section.unit)
            );
        }
        html.push_str("    </ul>\n");
    }

    html.push_str("  </div>\n");
}

fn render_text(view: &ReportView) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{}", view.dated_title());
    text.push('\n');

    match &view.body {
        ReportBody::NoData => {
            let _ = writeln!(text, "No data for {}.", view.business_date);
        }
        ReportBody::Summary { summary, sections } => {
            let _ = writeln!(text, "{}", view.summary_heading());
            for line in summary {
                let _ = writeln!(text, "- {}: {}", line.label, line.value);
            }
            for section in sections {
                let _ = writeln!(text, "\n{}", section.heading);
                if section.items.is_empty() {
                    text.push_str("- None\n");
                }
                for line in section.lines() {
                    let _ = writeln!(text, "- {line}");
                }
            }
        }
    }

    let _ = write!(text, "\n{FOOTER}\n");
    text
}

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
