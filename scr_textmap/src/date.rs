//! Date values are opaque `YYYY-MM-DD` strings; lexicographic order equals
//! chronological order, so range checks need no calendar arithmetic.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ISO_DATE_REGEX: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("failed to build ISO date regex");
}

/// Whether the value is a date in the format `YYYY-MM-DD`.
pub fn is_iso_date(value: &str) -> bool {
    ISO_DATE_REGEX.is_match(value)
}

/// Whether the date lies inside the inclusive range; an empty bound is
/// unbounded on that side.
pub fn is_iso_date_in_range(value: &str, from: &str, to: &str) -> bool {
    (from.is_empty() || value >= from) && (to.is_empty() || value <= to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_check() {
        assert!(is_iso_date("2020-01-01"));
        assert!(!is_iso_date("2020-1-1"));
        assert!(!is_iso_date("2020-01-01T00:00:00"));
        assert!(!is_iso_date(""));
    }

    #[test]
    fn range_check() {
        assert!(is_iso_date_in_range("2020-06-15", "2020-01-01", "2020-12-31"));
        assert!(is_iso_date_in_range("2020-01-01", "2020-01-01", "2020-01-01"));
        assert!(!is_iso_date_in_range("2019-12-31", "2020-01-01", ""));
        assert!(!is_iso_date_in_range("2021-01-01", "", "2020-12-31"));
        assert!(is_iso_date_in_range("1234-05-06", "", ""));
    }
}
