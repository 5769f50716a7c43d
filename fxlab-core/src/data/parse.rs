//! Cell-level parsing for dates and rate values.
//!
//! Both parsers are total: anything they cannot make sense of becomes `None`,
//! and the loader decides whether that skips a row or leaves a gap.

use chrono::{Duration, NaiveDate};

/// Date cell text some exports use for rows that have no real date yet.
pub const DATE_PLACEHOLDER: &str = "(auto)";

/// Primary date pattern of the weekly rate exports (`1/28/2026`).
pub const PRIMARY_DATE_FORMAT: &str = "%m/%d/%Y";

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Parse a date cell.
///
/// Accepts `%m/%d/%Y` first, then ISO `%Y-%m-%d`, then an Excel serial day
/// number (what a raw XLSX extraction yields for date-formatted cells). Empty
/// cells and the `(auto)` placeholder are `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case(DATE_PLACEHOLDER) {
        return None;
    }
    NaiveDate::parse_from_str(s, PRIMARY_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(s, ISO_DATE_FORMAT))
        .ok()
        .or_else(|| excel_serial_to_date(s))
}

/// Convert an Excel serial day number (1900 date system) to a date.
///
/// Uses the 1899-12-30 origin, which is exact for every date after
/// 1900-02-28. Any fractional (time-of-day) part is dropped.
pub fn excel_serial_to_date(raw: &str) -> Option<NaiveDate> {
    let serial: f64 = raw.trim().parse().ok()?;
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let origin = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    origin.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Parse a rate cell, tolerating currency formatting.
///
/// Currency symbols, thousands separators and surrounding whitespace are
/// stripped before conversion. Empty, non-numeric and non-finite results are
/// `None`.
pub fn parse_rate(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ','))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
