//! Date and date-time canonicalization

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};

/// Canonical form of a FHIR `date` (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`),
/// keeping the precision of the input
pub(crate) fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    let parts: Vec<&str> = value.split('-').collect();
    match parts.as_slice() {
        [year] if is_digits(year, 4) => Some(value.to_string()),
        [year, month] if is_digits(year, 4) && is_digits(month, 2) => {
            let year: i32 = year.parse().ok()?;
            let month: u32 = month.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(value.to_string())
        }
        [_, _, _] => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(|date| date.format("%Y-%m-%d").to_string()),
        _ => None,
    }
}

/// Canonical form of a FHIR `dateTime` or `instant`.
///
/// Values with an offset render as RFC 3339 with a numeric offset; values
/// without a time part are partial dates.
pub(crate) fn normalize_date_time(value: &str) -> Option<String> {
    let value = value.trim();
    if !value.contains('T') {
        return normalize_date(value);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.to_rfc3339_opts(SecondsFormat::AutoSi, false));
    }

    // local time without an offset
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|_| value.to_string())
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}
