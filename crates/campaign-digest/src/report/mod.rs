//! Report layout shared by every delivery channel

mod business_date;
mod view;

pub use business_date::{business_date, business_date_at};
pub use view::{AlertItem, AlertSection, ReportBody, ReportView, SummaryLine, REPORT_TITLE};
