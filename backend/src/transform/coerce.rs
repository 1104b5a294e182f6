//! Cell coercion: raw CSV text into typed values.
//!
//! Every function returns a [`Coerced`] so callers see why a cell was
//! rejected instead of receiving a silent null.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::config::NULL_TOKENS;
use crate::models::Coerced;

/// Date-only layouts, tried in order. Ambiguous day/month forms are read month-first.
const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y", "%m-%d-%Y", "%d %b %Y", "%b %d, %Y",
];

/// Date-time layouts; the time part is discarded.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// True if the cell is empty or a conventional null marker.
pub fn is_null_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    NULL_TOKENS.iter().any(|t| *t == trimmed)
}

/// Permissive calendar-date parsing.
pub fn coerce_date(raw: &str) -> Coerced<NaiveDate> {
    if is_null_token(raw) {
        return Coerced::Missing;
    }
    let s = raw.trim();

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Coerced::Value(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Coerced::Value(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Coerced::Value(dt.date_naive());
    }

    Coerced::invalid(raw, "unrecognised date")
}

/// Decimal literal, plain or scientific.
pub fn coerce_decimal(raw: &str) -> Coerced<Decimal> {
    if is_null_token(raw) {
        return Coerced::Missing;
    }
    let s = raw.trim().trim_start_matches('+');

    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map(Coerced::Value)
        .unwrap_or_else(|_| Coerced::invalid(raw, "not a decimal number"))
}

/// Whole number. Integral decimals such as `3.0` are accepted.
pub fn coerce_quantity(raw: &str) -> Coerced<i64> {
    if let Ok(n) = raw.trim().trim_start_matches('+').parse::<i64>() {
        return Coerced::Value(n);
    }

    match coerce_decimal(raw) {
        Coerced::Value(d) if d.fract().is_zero() => d
            .to_i64()
            .map(Coerced::Value)
            .unwrap_or_else(|| Coerced::invalid(raw, "out of range")),
        Coerced::Value(_) => Coerced::invalid(raw, "fractional quantity"),
        Coerced::Missing => Coerced::Missing,
        Coerced::Invalid { raw, .. } => Coerced::invalid(raw, "not an integer"),
    }
}

/// Free text; null markers become [`Coerced::Missing`]. The value is kept verbatim.
pub fn coerce_text(raw: &str) -> Coerced<String> {
    if is_null_token(raw) {
        Coerced::Missing
    } else {
        Coerced::Value(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(coerce_date("2024-01-05"), Coerced::Value(ymd(2024, 1, 5)));
        assert_eq!(coerce_date("2024/01/05"), Coerced::Value(ymd(2024, 1, 5)));
        assert_eq!(coerce_date("20240105"), Coerced::Value(ymd(2024, 1, 5)));
        assert_eq!(coerce_date("01/05/2024"), Coerced::Value(ymd(2024, 1, 5)));
        assert_eq!(coerce_date("5 Jan 2024"), Coerced::Value(ymd(2024, 1, 5)));
        assert_eq!(coerce_date(" 2024-01-05 "), Coerced::Value(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_datetime_truncated_to_day() {
        assert_eq!(coerce_date("2024-01-05 13:45:00"), Coerced::Value(ymd(2024, 1, 5)));
        assert_eq!(coerce_date("2024-01-05T23:59:59"), Coerced::Value(ymd(2024, 1, 5)));
        assert_eq!(coerce_date("2024-01-05T10:00:00+02:00"), Coerced::Value(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_bad_dates() {
        assert!(matches!(coerce_date("not-a-date"), Coerced::Invalid { .. }));
        assert!(matches!(coerce_date("2024-02-30"), Coerced::Invalid { .. }));
        assert_eq!(coerce_date(""), Coerced::Missing);
        assert_eq!(coerce_date("NaN"), Coerced::Missing);
    }

    #[test]
    fn test_quantity() {
        assert_eq!(coerce_quantity("3"), Coerced::Value(3));
        assert_eq!(coerce_quantity("-1"), Coerced::Value(-1));
        assert_eq!(coerce_quantity("+4"), Coerced::Value(4));
        assert_eq!(coerce_quantity("3.0"), Coerced::Value(3));
        assert_eq!(coerce_quantity(""), Coerced::Missing);

        match coerce_quantity("2.5") {
            Coerced::Invalid { reason, .. } => assert_eq!(reason, "fractional quantity"),
            other => panic!("unexpected {:?}", other),
        }
        match coerce_quantity("three") {
            Coerced::Invalid { raw, reason } => {
                assert_eq!(raw, "three");
                assert_eq!(reason, "not an integer");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decimal() {
        assert_eq!(coerce_decimal("10.0"), Coerced::Value(Decimal::new(100, 1)));
        assert_eq!(coerce_decimal("1e2"), Coerced::Value(Decimal::new(100, 0)));
        assert_eq!(coerce_decimal("N/A"), Coerced::Missing);
        assert!(matches!(coerce_decimal("ten"), Coerced::Invalid { .. }));
    }

    #[test]
    fn test_text_null_tokens() {
        assert_eq!(coerce_text(""), Coerced::Missing);
        assert_eq!(coerce_text("   "), Coerced::Missing);
        assert_eq!(coerce_text("null"), Coerced::Missing);
        assert_eq!(coerce_text("Pen"), Coerced::Value("Pen".to_string()));
    }
}
