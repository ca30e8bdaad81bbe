//! Splits a requested interval into the sub-ranges each source can serve in one page.

use chrono::{Datelike, NaiveDate};

use crate::errors::Result;
use crate::models::date_range::DateRange;
use crate::util;

/// How a source paginates its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionRule {
    /// One sub-range per calendar month crossed; consecutive sub-ranges share their boundary date.
    Monthly,
    /// Sub-ranges touch at most `n` calendar years; the next one starts the day after.
    YearWindow(u32),
    /// Steps of `n` years sharing their boundary date. The last sub-range runs from the
    /// final step to the end of the request, so it may touch `n + 1` calendar years.
    RollingYears(u32),
    /// The source returns the full history in one page.
    Single,
}

impl PartitionRule {
    /// Longest span, in months, any emitted sub-range may cover.
    pub fn max_span_months(&self) -> Option<i32> {
        match self {
            PartitionRule::Monthly => Some(1),
            PartitionRule::YearWindow(n) | PartitionRule::RollingYears(n) => Some(*n as i32 * 12),
            PartitionRule::Single => None,
        }
    }
}

/// Decomposes `[from, to]` according to `rule`; `from > to` is an `InvalidDateRange`.
pub fn partition(from: NaiveDate, to: NaiveDate, rule: PartitionRule) -> Result<Vec<DateRange>> {
    let requested = DateRange::new(from, to)?;
    Ok(match rule {
        PartitionRule::Monthly => by_month(requested.from, requested.to),
        PartitionRule::YearWindow(years) => by_year_window(requested.from, requested.to, years.max(1) as i32),
        PartitionRule::RollingYears(years) => by_rolling_years(requested.from, requested.to, years.max(1) as i32),
        PartitionRule::Single => vec![requested],
    })
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn by_month(from: NaiveDate, to: NaiveDate) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut cursor = from;
    while !same_month(cursor, to) {
        let next = util::add_months(cursor, 1);
        // Clamping (Jan 31 -> Feb 29 -> Mar 29) can land past `to` only in the last month.
        if next >= to || next <= cursor {
            break;
        }
        ranges.push(DateRange { from: cursor, to: next });
        cursor = next;
    }
    ranges.push(DateRange { from: cursor, to });
    ranges
}

fn by_year_window(from: NaiveDate, to: NaiveDate, years: i32) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut cursor = from;
    while to.year() - cursor.year() >= years {
        let end = util::add_years(cursor, years - 1);
        ranges.push(DateRange { from: cursor, to: end });
        cursor = match end.succ_opt() {
            Some(next) => next,
            None => return ranges,
        };
    }
    ranges.push(DateRange { from: cursor, to });
    ranges
}

fn by_rolling_years(from: NaiveDate, to: NaiveDate, years: i32) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut cursor = from;
    while to.year() - cursor.year() > years {
        let end = util::add_years(cursor, years);
        if end <= cursor {
            break;
        }
        ranges.push(DateRange { from: cursor, to: end });
        cursor = end;
    }
    ranges.push(DateRange { from: cursor, to });
    ranges
}
