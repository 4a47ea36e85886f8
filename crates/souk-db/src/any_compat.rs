//! Bind-side helpers for `AnyPool`.
//!
//! The Any driver has no native UUID, timestamp or boolean binding that works
//! the same on PostgreSQL and SQLite, so values go in as text or integers.
//! Decoding lives in `souk_common::any_row`.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Timestamp as stored: RFC 3339, microseconds, `Z` suffix. Sorts lexically.
pub fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn opt_ts(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(ts)
}

pub fn now() -> String {
    ts(Utc::now())
}

pub fn id(id: Uuid) -> String {
    id.to_string()
}

pub fn opt_id(id: Option<Uuid>) -> Option<String> {
    id.map(|v| v.to_string())
}

pub fn flag(value: bool) -> i64 {
    i64::from(value)
}

/// `%term%` for a case-insensitive `LOWER(col) LIKE` match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_as_text() {
        let a = Utc::now();
        let b = a + chrono::Duration::milliseconds(5);
        assert!(ts(a) < ts(b));
        assert!(ts(a).ends_with('Z'));
    }

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern(" Rice "), "%rice%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
    }
}
