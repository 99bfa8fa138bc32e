//! Unified feed item model
//!
//! A [`FeedItem`] is the single representation of one activity record,
//! whichever collection it came from. Items synthesized from a secondary
//! kind carry a kind-prefixed id (`message_{raw}`, `grade_{raw}`) so they
//! never collide with native notification ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of activity a feed item represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Grade,
    Assignment,
    Progress,
    Message,
    Event,
    Generic,
}

impl FeedKind {
    /// Parse a raw `type` field. Unknown or missing types map to `Generic`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "grade" => Self::Grade,
            "assignment" => Self::Assignment,
            "progress" => Self::Progress,
            "message" => Self::Message,
            "event" => Self::Event,
            _ => Self::Generic,
        }
    }
}

/// Opaque reference back to the originating record.
///
/// Used only by read-state reconciliation; the variant selects which
/// write-back mechanism applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mechanism", rename_all = "snake_case")]
pub enum SourceRef {
    /// Native notification document: direct field update
    Notification { doc_id: String },
    /// Message document: the message is the record, update it directly
    Message { doc_id: String },
    /// Grade record: read-only for us, acknowledged via the principal's
    /// side record instead
    Grade { grade_id: String },
}

/// The unified, deduplicated representation of one activity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    /// Stable id, unique within the merged set
    pub id: String,
    pub kind: FeedKind,
    pub title: String,
    pub body: String,
    /// Normalized instant (see [`crate::feed::timestamp`])
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    /// Reference back to the originating record
    pub source: SourceRef,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// Teacher/author display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty_name: Option<String>,
    /// Grade id / message id / event id the item refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
}

impl FeedItem {
    /// Id used for items promoted from a message document
    pub fn message_id(raw_id: &str) -> String {
        format!("message_{}", raw_id)
    }

    /// Id used for items synthesized from a grade record
    pub fn grade_id(raw_id: &str) -> String {
        format!("grade_{}", raw_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_known_values() {
        assert_eq!(FeedKind::parse("grade"), FeedKind::Grade);
        assert_eq!(FeedKind::parse("assignment"), FeedKind::Assignment);
        assert_eq!(FeedKind::parse("progress"), FeedKind::Progress);
        assert_eq!(FeedKind::parse("message"), FeedKind::Message);
        assert_eq!(FeedKind::parse("event"), FeedKind::Event);
    }

    #[test]
    fn test_kind_parse_unknown_is_generic() {
        assert_eq!(FeedKind::parse("something-else"), FeedKind::Generic);
        assert_eq!(FeedKind::parse(""), FeedKind::Generic);
    }

    #[test]
    fn test_synthesized_ids_are_prefixed() {
        assert_eq!(FeedItem::message_id("abc"), "message_abc");
        assert_eq!(FeedItem::grade_id("abc"), "grade_abc");
        // A message promoted into the feed can never collide with a native
        // notification that happens to share the raw id
        assert_ne!(FeedItem::message_id("abc"), "abc");
    }

    #[test]
    fn test_source_ref_roundtrip() {
        let source = SourceRef::Grade {
            grade_id: "g1".to_string(),
        };
        let json = serde_json::to_string(&source).unwrap();
        let back: SourceRef = serde_json::from_str(&json).unwrap();
        assert_eq!(source, back);
    }
}
