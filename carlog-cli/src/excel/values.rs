//! Cell value coercion (import) and display formatting (export)
//!
//! Coercers never fail: malformed input and blank input both come back as
//! `None`, and the field is left unset on the row.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::records::{FieldKind, FieldValue};

use super::RawCell;

/// Day 0 of spreadsheet date serials: one day before 1899-12-31 so serials
/// past the phantom 1900-02-29 line up with the producing application
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Date layouts accepted for textual dates, tried in order
///
/// Two-digit year layouts come first: `%Y` would also accept "24" as year 24.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%a %b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(\d+\.?\d*|\.\d+)").expect("leading float pattern is valid")
});

/// Coerce a cell into the value class a field expects
pub fn coerce(cell: &RawCell, kind: FieldKind) -> Option<FieldValue> {
    match kind {
        FieldKind::Text => parse_text(cell).map(FieldValue::Text),
        FieldKind::Date => parse_date(cell).map(FieldValue::Date),
        FieldKind::Bool => parse_bool(cell).map(FieldValue::Bool),
        FieldKind::Number | FieldKind::Currency => parse_number(cell).map(FieldValue::Number),
    }
}

/// Trimmed display text, None when blank
pub fn parse_text(cell: &RawCell) -> Option<String> {
    let text = cell.display_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Calendar date from a date string or a spreadsheet serial
pub fn parse_date(cell: &RawCell) -> Option<NaiveDate> {
    match cell {
        RawCell::Number(serial) | RawCell::Date(serial) => date_from_serial(*serial),
        RawCell::Text(s) => parse_date_str(s),
        RawCell::Empty | RawCell::Bool(_) => None,
    }
}

/// Decode a spreadsheet date serial, discarding the time-of-day fraction
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor();
    if days > u32::MAX as f64 {
        return None;
    }
    serial_epoch().checked_add_days(chrono::Days::new(days as u64))
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Serial stored as text
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<f64>().ok().and_then(date_from_serial);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Tri-state boolean: Y/yes/true/1 and N/no/false/0, anything else absent
pub fn parse_bool(cell: &RawCell) -> Option<bool> {
    match cell {
        RawCell::Bool(b) => Some(*b),
        RawCell::Number(n) | RawCell::Date(n) if n.is_nan() => None,
        RawCell::Number(n) | RawCell::Date(n) => Some(*n != 0.0),
        RawCell::Text(s) => match s.trim().to_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Some(true),
            "n" | "no" | "false" | "0" => Some(false),
            _ => None,
        },
        RawCell::Empty => None,
    }
}

/// Number from a numeric cell, or from text after stripping everything
/// except digits, '.' and '-' ("$1,250.00" -> 1250.0)
pub fn parse_number(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Number(n) | RawCell::Date(n) if n.is_nan() => None,
        RawCell::Number(n) | RawCell::Date(n) => Some(*n),
        RawCell::Text(s) => parse_number_str(s),
        RawCell::Empty | RawCell::Bool(_) => None,
    }
}

fn parse_number_str(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    // Longest leading float, so "1.2.3" reads as 1.2 and "12-5" as 12
    let m = LEADING_FLOAT.find(&cleaned)?;
    m.as_str().parse::<f64>().ok()
}

/// Export text for a date: `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Export text for a tri-state boolean: "Y", "N" or blank
pub fn format_bool(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Y",
        Some(false) => "N",
        None => "",
    }
}

/// Currency display with symbol and thousands separators: `-$1,234.50`
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{:02}", if negative { "-" } else { "" }, grouped, frac)
}

/// Human display of a field value according to its kind
pub fn display_value(value: &FieldValue, kind: FieldKind) -> String {
    match (value, kind) {
        (FieldValue::Number(n), FieldKind::Currency) => format_currency(*n),
        (FieldValue::Date(d), _) => format_date(*d),
        (FieldValue::Bool(b), _) => format_bool(Some(*b)).to_string(),
        (other, _) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(date_from_serial(0.0), Some(ymd(1899, 12, 30)));
        assert_eq!(date_from_serial(1.0), Some(ymd(1899, 12, 31)));
        // The phantom 1900-02-29 cannot be represented; epoch + 60 days
        assert_eq!(date_from_serial(60.0), Some(ymd(1900, 2, 28)));
        assert_eq!(date_from_serial(61.0), Some(ymd(1900, 3, 1)));
        assert_eq!(date_from_serial(45292.0), Some(ymd(2024, 1, 1)));
        // Time of day discarded
        assert_eq!(date_from_serial(45292.75), Some(ymd(2024, 1, 1)));
        assert_eq!(date_from_serial(-1.0), None);
        assert_eq!(date_from_serial(f64::NAN), None);
    }

    #[test]
    fn test_serial_is_epoch_plus_days() {
        for n in [0u64, 1, 59, 61, 366, 10_000, 45_000, 60_000] {
            let expected = serial_epoch()
                .checked_add_days(chrono::Days::new(n))
                .unwrap();
            assert_eq!(date_from_serial(n as f64), Some(expected));
        }
    }

    #[test]
    fn test_text_dates() {
        assert_eq!(parse_date(&text("2024-03-15")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(&text("3/15/2024")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(&text("3/15/24")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(&text("Mar 15, 2024")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(&text("15-Mar-2024")), Some(ymd(2024, 3, 15)));
        assert_eq!(
            parse_date(&text("2024-03-15T18:30:00Z")),
            Some(ymd(2024, 3, 15))
        );
        assert_eq!(parse_date(&text("2024-03-15 08:00")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(&text("45366")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(&text("not a date")), None);
        assert_eq!(parse_date(&text("2024-02-30")), None);
        assert_eq!(parse_date(&RawCell::Empty), None);
        assert_eq!(parse_date(&RawCell::Bool(true)), None);
    }

    #[test]
    fn test_bool() {
        for s in ["y", "Y", "yes", "YES", " true ", "1"] {
            assert_eq!(parse_bool(&text(s)), Some(true), "{s}");
        }
        for s in ["n", "No", "FALSE", "0"] {
            assert_eq!(parse_bool(&text(s)), Some(false), "{s}");
        }
        assert_eq!(parse_bool(&text("maybe")), None);
        assert_eq!(parse_bool(&text("")), None);
        assert_eq!(parse_bool(&RawCell::Empty), None);
        assert_eq!(parse_bool(&RawCell::Bool(false)), Some(false));
        assert_eq!(parse_bool(&RawCell::Number(0.0)), Some(false));
        assert_eq!(parse_bool(&RawCell::Number(2.5)), Some(true));
    }

    #[test]
    fn test_number_is_permissive() {
        assert_eq!(parse_number(&RawCell::Number(12.5)), Some(12.5));
        assert_eq!(parse_number(&RawCell::Number(f64::NAN)), None);
        assert_eq!(parse_number(&text("$1,250.75")), Some(1250.75));
        assert_eq!(parse_number(&text("approx 40 pcs")), Some(40.0));
        assert_eq!(parse_number(&text("-12")), Some(-12.0));
        assert_eq!(parse_number(&text("1.2.3")), Some(1.2));
        assert_eq!(parse_number(&text(".5")), Some(0.5));
        assert_eq!(parse_number(&text("n/a")), None);
        assert_eq!(parse_number(&text("-")), None);
        assert_eq!(parse_number(&RawCell::Bool(true)), None);
    }

    #[test]
    fn test_text() {
        assert_eq!(parse_text(&text("  Plant 2 ")), Some("Plant 2".into()));
        assert_eq!(parse_text(&RawCell::Number(1001.0)), Some("1001".into()));
        assert_eq!(parse_text(&text("   ")), None);
    }

    #[test]
    fn test_date_cell_into_each_kind() {
        let cell = RawCell::Date(45292.0);
        assert_eq!(
            coerce(&cell, FieldKind::Text),
            Some(FieldValue::Text("2024-01-01".into()))
        );
        assert_eq!(
            coerce(&cell, FieldKind::Date),
            Some(FieldValue::Date(ymd(2024, 1, 1)))
        );
        assert_eq!(coerce(&cell, FieldKind::Number), Some(FieldValue::Number(45292.0)));
    }

    #[test]
    fn test_bool_export_roundtrip() {
        for b in [true, false] {
            let exported = format_bool(Some(b));
            assert_eq!(parse_bool(&text(exported)), Some(b));
        }
        // Absent stays absent, never false
        assert_eq!(parse_bool(&text(format_bool(None))), None);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(-42.0), "-$42.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(
            display_value(&FieldValue::Number(1500.0), FieldKind::Currency),
            "$1,500.00"
        );
        assert_eq!(display_value(&FieldValue::Number(3.0), FieldKind::Number), "3");
        assert_eq!(display_value(&FieldValue::Bool(false), FieldKind::Bool), "N");
    }
}
