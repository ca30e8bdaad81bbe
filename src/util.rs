use chrono::{Datelike, Months, NaiveDate, Utc};
use chrono_tz::America::Costa_Rica;

use crate::errors::{IndicatorError, Result};
use crate::models::indicator::RangeRequest;

/// Query-string and source URL date format
pub const DATE_FORMAT: &str = "%Y/%m/%d";
pub const MINIMUM_YEAR: i32 = 1900;
pub const DEFAULT_DAYS_TO_GO_BACK: u64 = 30;

// Spanish abbreviations as printed by the BCCR tables ("Set" is September there).
const SHORT_MONTHS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "set", "oct", "nov", "dic",
];

const LONG_MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio",
    "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Current date in Costa Rica, where the central bank publishes.
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&Costa_Rica).date_naive()
}

/// Parses a `YYYY/MM/DD` query parameter; anything else is `InvalidDateFormat`.
pub fn parse_request_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| IndicatorError::InvalidDateFormat)
}

/// Formats a date the way the BCCR query string expects it (`YYYY/MM/DD`).
pub fn format_source_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `[today - days, today]`, used when the caller gives no range.
pub fn default_range(today: NaiveDate, days: u64) -> RangeRequest {
    let date_from = today
        .checked_sub_days(chrono::Days::new(days))
        .unwrap_or(today);
    RangeRequest {
        date_from,
        date_to: today,
    }
}

/// Requested ranges must be strictly increasing, start no earlier than 1900 and end by today.
pub fn validate_range(date_from: NaiveDate, date_to: NaiveDate, today: NaiveDate) -> Result<RangeRequest> {
    let valid = date_from.year() >= MINIMUM_YEAR
        && date_to.year() >= MINIMUM_YEAR
        && date_from < date_to
        && date_to <= today;
    if !valid {
        return Err(IndicatorError::InvalidDateRange);
    }
    Ok(RangeRequest { date_from, date_to })
}

/// Calendar month arithmetic; day-of-month is clamped to the target month's length.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Calendar year arithmetic; Feb 29 clamps to Feb 28 in non-leap years.
pub fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    add_months(date, years * 12)
}

/// First day of the month `date` falls in.
pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month `date` falls in.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = first_day_of_month(date);
    add_months(first, 1).pred_opt().unwrap_or(date)
}

/// Month number for a Spanish (short or long) or English month name.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    if let Ok(n) = name.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    [&SHORT_MONTHS[..], &LONG_MONTHS[..], &ENGLISH_MONTHS[..]]
        .iter()
        .find_map(|table| table.iter().position(|m| *m == name))
        .or_else(|| ENGLISH_MONTHS.iter().position(|m| name.len() == 3 && m.starts_with(&name)))
        .map(|idx| idx as u32 + 1)
}

/// Parses source numbers written with a decimal comma ("580,10").
pub fn parse_decimal(value: &str) -> Result<f64> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| IndicatorError::ParseError(format!("invalid number '{}': {}", value, e)))
}

/// Parses "15 Mar 2020" style dates.
pub fn parse_day_month_year(value: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(IndicatorError::ParseError(format!("Invalid date format: {}", value)));
    }
    let day = parts[0].parse::<u32>()
        .map_err(|e| IndicatorError::ParseError(e.to_string()))?;
    let month = month_number(parts[1])
        .ok_or_else(|| IndicatorError::ParseError(format!("Unknown month: {}", parts[1])))?;
    let year = parts[2].parse::<i32>()
        .map_err(|e| IndicatorError::ParseError(e.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| IndicatorError::ParseError(format!("Invalid date: {}-{}-{}", year, month, day)))
}

/// Parses "Enero/2020" style month labels into the first day of that month.
pub fn parse_month_year(value: &str) -> Result<NaiveDate> {
    let (month, year) = value
        .split_once('/')
        .ok_or_else(|| IndicatorError::ParseError(format!("Invalid month label: {}", value)))?;
    let month = month_number(month)
        .ok_or_else(|| IndicatorError::ParseError(format!("Unknown month: {}", month)))?;
    let year = year.trim().parse::<i32>()
        .map_err(|e| IndicatorError::ParseError(e.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| IndicatorError::ParseError(format!("Invalid month: {}/{}", month, year)))
}
