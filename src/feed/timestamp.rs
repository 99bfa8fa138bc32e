//! Timestamp normalization
//!
//! Raw records carry their instant in one of several shapes: an ISO-8601
//! string, a store-native datetime, or a store-native seconds timestamp.
//! The ladder below is tried in a fixed order, first on `timestamp`, then
//! on `created_at`, and finally falls back to the current instant.
//!
//! The "now" fallback is deliberate policy, not an accident: a record whose
//! timestamp cannot be parsed sorts to the top of the feed rather than
//! disappearing into the past. Changing the ladder order changes sort
//! behavior for malformed records.

use bson::{Bson, Document};
use chrono::{DateTime, TimeZone, Utc};

/// Normalize a raw record's timestamp, preferring `timestamp` over
/// `created_at`, falling back to now.
pub fn normalize(doc: &Document) -> DateTime<Utc> {
    normalize_at(doc, Utc::now())
}

/// Same ladder with an explicit fallback instant
pub fn normalize_at(doc: &Document, now: DateTime<Utc>) -> DateTime<Utc> {
    doc.get("timestamp")
        .and_then(parse_instant)
        .or_else(|| doc.get("created_at").and_then(parse_instant))
        .unwrap_or(now)
}

/// Parse one BSON value into an instant: ISO string, native datetime, or
/// seconds timestamp, in that order of recognition.
pub fn parse_instant(value: &Bson) -> Option<DateTime<Utc>> {
    match value {
        Bson::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Bson::DateTime(dt) => Some(dt.to_chrono()),
        Bson::Timestamp(ts) => Utc.timestamp_opt(i64::from(ts.time), 0).single(),
        _ => None,
    }
}
