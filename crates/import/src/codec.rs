//! Chilean locale codec: `.` groups thousands, `,` marks decimals, dates are
//! day-first. Every function here is pure; a value that does not parse comes
//! back as `None`, never as zero.

use cartola_core::Money;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

// Two-digit years first: `%Y` would happily read `25` as the year 0025.
// Day-first wins; month-first is only tried once no day-first reading is a
// real date (`12/31/2025`).
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d-%m-%y", "%d.%m.%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d",
    "%Y/%m/%d", "%m/%d/%y", "%m-%d-%y", "%m/%d/%Y", "%m-%d-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parses a Chilean-formatted amount such as `1.234.567,89` or `-50.000`.
///
/// `.` is always a thousands separator, never a decimal point.
pub fn parse_amount(raw: &str) -> Option<Money> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '\u{a0}' && *c != ' ' && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok().map(Money::new)
}

/// Accounting exports carry currency symbols and codes (`$`, `CLP`); drop
/// everything outside `[0-9.,-]` before handing off to [`parse_amount`].
pub fn clean_amount(raw: &str) -> Option<Money> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    parse_amount(&kept)
}

/// Inverse of [`parse_amount`]: no grouping, `,` as the decimal mark.
pub fn format_amount(amount: Money) -> String {
    amount.amount().normalize().to_string().replace('.', ",")
}

/// Parses a day-first date (`31/01/2025`, `31-01-25`, `2025-01-31`, ...).
/// A trailing time part is accepted and discarded.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
