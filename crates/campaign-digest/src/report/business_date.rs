//! Business date computation
//!
//! The business date is yesterday in the reporting zone's calendar, not in
//! the calendar of whatever machine the scheduler happens to run on.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// The calendar day before `now` as observed in `timezone`
pub fn business_date_at(now: DateTime<Utc>, timezone: Tz) -> Result<NaiveDate> {
    now.with_timezone(&timezone)
        .date_naive()
        .pred_opt()
        .ok_or_else(|| Error::validation(format!("no calendar day precedes {now}")))
}

/// Yesterday in `timezone`
pub fn business_date(timezone: Tz) -> Result<NaiveDate> {
    business_date_at(Utc::now(), timezone)
}
