//! Reduction of a row set into global totals

use crate::error::Result;
use crate::models::{MetricRow, Totals};

/// Sum every metric across `rows`; an empty slice gives all zeros
pub fn aggregate<'a>(rows: impl IntoIterator<Item = &'a MetricRow>) -> Result<Totals> {
    rows.into_iter().try_fold(Totals::default(), |mut totals, row| {
        totals.add(row)?;
        Ok(totals)
    })
}
