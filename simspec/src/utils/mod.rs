//! Utility functions for identifiers, timestamps and keyword matching.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A UTC timestamp.
pub type Timestamp = DateTime<Utc>;

/// Generates a new time-ordered UUID v7 for a session.
#[must_use]
pub fn generate_session_id() -> Uuid {
    Uuid::now_v7()
}

/// Returns the current UTC time.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the current time as an ISO 8601 string with microseconds.
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&Utc::now())
}

/// Formats a timestamp as ISO 8601 with microseconds and an explicit offset.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns true if `haystack_lower` contains any of `needles`.
///
/// Matching is case-sensitive: callers lowercase the haystack and `needles`
/// are lowercase already.
#[must_use]
pub fn contains_any(haystack_lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack_lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_any_is_case_sensitive() {
        assert!(!contains_any("A WELDED BRACKET", &["weld"]));
        assert!(contains_any(&"A WELDED BRACKET".to_lowercase(), &["weld"]));
    }

    #[test]
    fn test_generate_session_id_is_v7() {
        let id = generate_session_id();
        assert_eq!(id.get_version_num(), 7);
    }

    #[test]
    fn test_session_ids_are_time_ordered() {
        let first = generate_session_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = generate_session_id();
        assert!(first < second);
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }

    #[test]
    fn test_contains_any() {
        assert!(contains_any("a welded bracket", &["bolt", "weld"]));
        assert!(!contains_any("a plain plate", &["bolt", "weld"]));
        assert!(!contains_any("anything", &[]));
    }
}
