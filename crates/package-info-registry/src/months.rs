//! Calendar-month date ranges for download-count queries.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of months covered by a download history.
pub const MONTHS: usize = 12;

/// One calendar month as inclusive start/end dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthRange {
    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Option<Self> {
        Self::starting_at(date.with_day(1)?)
    }

    fn starting_at(start: NaiveDate) -> Option<Self> {
        // Last day = day before the first of the next month.
        let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
        Some(Self { start, end })
    }

    /// `YYYY-MM`
    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

/// `YYYY-MM-DD:YYYY-MM-DD`, the form used in download API paths.
impl fmt::Display for MonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// The [`MONTHS`] calendar months ending with the month containing `today`,
/// oldest first.
pub fn month_ranges(today: NaiveDate) -> Vec<MonthRange> {
    let Some(current) = today.with_day(1) else {
        return Vec::new();
    };
    (0..MONTHS as u32)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .filter_map(MonthRange::starting_at)
        .collect()
}
