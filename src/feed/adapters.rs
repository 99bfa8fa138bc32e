//! Source adapters
//!
//! One adapter per record kind. Each issues equality-filtered, limited
//! queries against its collection and normalizes raw records into the
//! shared item shape. A malformed record is skipped, never fatal; missing
//! optional fields get defaults.
//!
//! Messages and grades reference foreign entities (author, course) whose
//! labels are resolved in batch afterwards, so those adapters emit
//! intermediate items that are finalized once the label maps are available
//! (see [`crate::feed::resolver`]).

use bson::Document;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::feed::item::{FeedItem, FeedKind, SourceRef};
use crate::feed::timestamp;
use crate::store::{self, DocumentStore, StoredDoc};
use crate::types::Result;

/// Result size bounds, per collection. Fixed limits keep latency
/// predictable regardless of historical volume.
pub const NOTIFICATION_LIMIT: usize = 100;
pub const MESSAGE_LIMIT: usize = 100;
pub const GRADE_LIMIT: usize = 20;

/// Who the feed is built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedScope {
    /// The consumer (parent or teacher) requesting the feed
    pub principal_id: String,
    /// Dependent (student) whose activity the principal also sees
    pub dependent_id: Option<String>,
}

impl FeedScope {
    pub fn principal(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            dependent_id: None,
        }
    }

    pub fn with_dependent(principal_id: impl Into<String>, dependent_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            dependent_id: Some(dependent_id.into()),
        }
    }

    /// The id grade queries filter on: the dependent when present,
    /// otherwise the principal themselves
    pub fn student_id(&self) -> &str {
        self.dependent_id.as_deref().unwrap_or(&self.principal_id)
    }
}

// ============================================================================
// Notification adapter
// ============================================================================

/// Adapter for the `notifications` collection.
///
/// Queries once for the principal and, when the scope has a dependent, once
/// more for the dependent. The two predicates can surface the same document;
/// the merge engine collapses such duplicates.
pub struct NotificationAdapter<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> NotificationAdapter<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, scope: &FeedScope) -> Result<Vec<FeedItem>> {
        let mut raw = self
            .store
            .find(
                store::NOTIFICATIONS,
                "user_id",
                scope.principal_id.clone().into(),
                NOTIFICATION_LIMIT,
            )
            .await?;

        if let Some(dependent) = &scope.dependent_id {
            let dependent_docs = self
                .store
                .find(
                    store::NOTIFICATIONS,
                    "user_id",
                    dependent.clone().into(),
                    NOTIFICATION_LIMIT,
                )
                .await?;
            raw.extend(dependent_docs);
        }

        Ok(raw.into_iter().filter_map(normalize_notification).collect())
    }
}

fn normalize_notification(doc: StoredDoc) -> Option<FeedItem> {
    if doc.id.is_empty() {
        debug!("Skipping notification without id");
        return None;
    }
    let data = doc.data;

    let kind = data
        .get_str("type")
        .map(FeedKind::parse)
        .unwrap_or(FeedKind::Generic);

    Some(FeedItem {
        id: doc.id.clone(),
        kind,
        title: opt_string(&data, "title").unwrap_or_else(|| "Notification".to_string()),
        body: opt_string(&data, "message").unwrap_or_default(),
        timestamp: timestamp::normalize(&data),
        // `read` must be a strict boolean true; anything else is unread
        read: data.get_bool("read").unwrap_or(false),
        source: SourceRef::Notification { doc_id: doc.id },
        course_title: opt_string(&data, "courseTitle"),
        action_url: opt_string(&data, "action_url"),
        counterparty_name: opt_string(&data, "teacherName"),
        related_entity_id: opt_string(&data, "messageId").or_else(|| opt_string(&data, "event_id")),
        event_date: opt_string(&data, "event_date"),
        event_time: opt_string(&data, "event_time"),
    })
}

// ============================================================================
// Message adapter
// ============================================================================

/// A message normalized but not yet labeled with its author's name
#[derive(Debug, Clone)]
pub struct MessageItem {
    pub doc_id: String,
    pub from: String,
    pub snippet: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Adapter for the `messages` collection.
///
/// Surfaces replies addressed to the principal as feed items. Messages the
/// principal sent themselves are not activity and are skipped.
pub struct MessageAdapter<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> MessageAdapter<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, scope: &FeedScope) -> Result<Vec<MessageItem>> {
        let raw = self
            .store
            .find(
                store::MESSAGES,
                "to",
                scope.principal_id.clone().into(),
                MESSAGE_LIMIT,
            )
            .await?;

        Ok(raw
            .into_iter()
            .filter_map(|doc| normalize_message(doc, &scope.principal_id))
            .collect())
    }
}

fn normalize_message(doc: StoredDoc, principal_id: &str) -> Option<MessageItem> {
    let data = doc.data;
    let from = data.get_str("from").ok()?.to_string();
    if from == principal_id {
        return None;
    }

    let content = data.get_str("content").unwrap_or_default();
    let snippet = if content.chars().count() > 50 {
        let head: String = content.chars().take(50).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    };

    Some(MessageItem {
        doc_id: doc.id,
        from,
        snippet,
        timestamp: timestamp::normalize(&data),
        read: data.get_bool("read").unwrap_or(false),
    })
}

/// Promote a message into a feed item once author labels are known
pub fn finalize_message(msg: MessageItem, author_labels: &HashMap<String, String>) -> FeedItem {
    let teacher_name = author_labels
        .get(&msg.from)
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());

    FeedItem {
        id: FeedItem::message_id(&msg.doc_id),
        kind: FeedKind::Message,
        title: "New reply from your teacher".to_string(),
        body: format!("{} replied to your message: {}", teacher_name, msg.snippet),
        timestamp: msg.timestamp,
        read: msg.read,
        source: SourceRef::Message {
            doc_id: msg.doc_id.clone(),
        },
        course_title: None,
        action_url: None,
        counterparty_name: Some(teacher_name),
        related_entity_id: Some(msg.doc_id),
        event_date: None,
        event_time: None,
    }
}

// ============================================================================
// Grade adapter
// ============================================================================

/// A grade normalized but not yet labeled with its course title
#[derive(Debug, Clone)]
pub struct GradeItem {
    pub doc_id: String,
    pub value: String,
    pub course_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Adapter for the `grades` collection.
///
/// Grade records vary in which field names the student id: `studentId`,
/// `user_id`, or `student`. The chain is tried in order, stopping at the
/// first non-empty result. Grade records cannot carry a `read` flag the
/// dashboard may write, so read state comes from the principal's side
/// record in `notification_read_status`.
pub struct GradeAdapter<'a> {
    store: &'a dyn DocumentStore,
}

const GRADE_STUDENT_FIELDS: [&str; 3] = ["studentId", "user_id", "student"];

impl<'a> GradeAdapter<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, scope: &FeedScope) -> Result<Vec<GradeItem>> {
        let student_id = scope.student_id();

        let mut raw = Vec::new();
        for field in GRADE_STUDENT_FIELDS {
            raw = self
                .store
                .find(store::GRADES, field, student_id.into(), GRADE_LIMIT)
                .await?;
            if !raw.is_empty() {
                break;
            }
        }

        // No grades, no read state to consult
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        let read_grades = self.read_grades(&scope.principal_id).await?;

        Ok(raw
            .into_iter()
            .map(|doc| normalize_grade(doc, &read_grades))
            .collect())
    }

    /// Grade ids the principal has already acknowledged, deduplicated.
    ///
    /// Concurrent mark-read calls can leave a duplicate id in the side
    /// record; deduplicating here keeps that harmless.
    async fn read_grades(&self, principal_id: &str) -> Result<Vec<String>> {
        let Some(doc) = self.store.get(store::READ_STATUS, principal_id).await? else {
            return Ok(Vec::new());
        };

        let mut ids: Vec<String> = doc
            .data
            .get_array("readGrades")
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        ids.dedup();

        Ok(ids)
    }
}

fn normalize_grade(doc: StoredDoc, read_grades: &[String]) -> GradeItem {
    let data = doc.data;

    let value = opt_string(&data, "value")
        .or_else(|| opt_string(&data, "grade"))
        .or_else(|| numeric_string(&data, "value"))
        .or_else(|| numeric_string(&data, "grade"))
        .unwrap_or_else(|| "0".to_string());

    let timestamp = data
        .get("date")
        .and_then(timestamp::parse_instant)
        .or_else(|| data.get("graded_at").and_then(timestamp::parse_instant))
        .unwrap_or_else(Utc::now);

    GradeItem {
        read: read_grades.contains(&doc.id),
        value,
        course_id: opt_string(&data, "course_id"),
        timestamp,
        doc_id: doc.id,
    }
}

/// Synthesize a feed item from a grade once course labels are known
pub fn finalize_grade(grade: GradeItem, course_labels: &HashMap<String, String>) -> FeedItem {
    let course_title = grade
        .course_id
        .as_ref()
        .and_then(|id| course_labels.get(id).cloned())
        .unwrap_or_else(|| "Unknown".to_string());

    FeedItem {
        id: FeedItem::grade_id(&grade.doc_id),
        kind: FeedKind::Grade,
        title: "New grade".to_string(),
        body: format!("Received grade {} in {}", grade.value, course_title),
        timestamp: grade.timestamp,
        read: grade.read,
        source: SourceRef::Grade {
            grade_id: grade.doc_id.clone(),
        },
        course_title: Some(course_title),
        action_url: None,
        counterparty_name: None,
        related_entity_id: Some(grade.doc_id),
        event_date: None,
        event_time: None,
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn opt_string(data: &Document, key: &str) -> Option<String> {
    data.get_str(key).ok().map(str::to_string)
}

fn numeric_string(data: &Document, key: &str) -> Option<String> {
    match data.get(key)? {
        bson::Bson::Int32(n) => Some(n.to_string()),
        bson::Bson::Int64(n) => Some(n.to_string()),
        bson::Bson::Double(n) => Some(n.to_string()),
        _ => None,
    }
}
