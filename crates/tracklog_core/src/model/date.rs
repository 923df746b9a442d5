//! Calendar-day helpers for the canonical `YYYY-MM-DD` format.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// `chrono` format string matching the canonical day representation.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

static CANONICAL_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid day regex"));

/// Returns whether `value` is a real calendar day written as `YYYY-MM-DD`.
///
/// Shape is checked first so lenient `chrono` parsing (`2024-1-5`) does not
/// slip through as canonical.
pub fn is_canonical_day(value: &str) -> bool {
    CANONICAL_DAY_RE.is_match(value) && NaiveDate::parse_from_str(value, DAY_FORMAT).is_ok()
}

/// Parses a canonical day, returning `None` for anything else.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    if !CANONICAL_DAY_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, DAY_FORMAT).ok()
}

/// Today's local date in canonical form.
pub fn today() -> String {
    Local::now().date_naive().format(DAY_FORMAT).to_string()
}
