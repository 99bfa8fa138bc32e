//! Read-state reconciliation
//!
//! Persisting a "mark as read" acknowledgment depends on where the item
//! came from, selected by the item's [`SourceRef`] variant:
//!
//! - **Notification**: direct field update on the originating document
//! - **Message**: the message is the record, update its `read` field
//! - **Grade**: grade records are outside our write scope, so the
//!   acknowledgment lands in the principal's side record in
//!   `notification_read_status` (read-modify-write, append if absent)
//!
//! All three mechanisms are idempotent. The grade path is the only one
//! requiring a read before the write; a lost update between two concurrent
//! mark-read calls can at worst duplicate an id in the list, which the
//! grade adapter deduplicates on the next read.

use bson::{doc, Bson};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::feed::item::{FeedItem, SourceRef};
use crate::store::{self, DocumentStore};
use crate::types::Result;

/// Outcome of a fan-out mark-all operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkAllOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Routes read acknowledgments to the correct origin
pub struct ReadStateReconciler {
    store: Arc<dyn DocumentStore>,
}

impl ReadStateReconciler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persist a single read acknowledgment
    pub async fn mark_read(&self, principal_id: &str, source: &SourceRef) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        match source {
            SourceRef::Notification { doc_id } => {
                self.store
                    .update_fields(
                        store::NOTIFICATIONS,
                        doc_id,
                        doc! { "read": true, "readAt": now },
                    )
                    .await
            }
            SourceRef::Message { doc_id } => {
                self.store
                    .update_fields(store::MESSAGES, doc_id, doc! { "read": true, "readAt": now })
                    .await
            }
            SourceRef::Grade { grade_id } => self.append_read_grade(principal_id, grade_id).await,
        }
    }

    /// Read-modify-write the principal's side record, appending the grade
    /// id if absent
    async fn append_read_grade(&self, principal_id: &str, grade_id: &str) -> Result<()> {
        let mut read_grades: Vec<String> = self
            .store
            .get(store::READ_STATUS, principal_id)
            .await?
            .and_then(|doc| {
                doc.data.get_array("readGrades").ok().map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
            })
            .unwrap_or_default();

        if read_grades.iter().any(|id| id == grade_id) {
            debug!(grade_id, "Grade already acknowledged, nothing to write");
            return Ok(());
        }
        read_grades.push(grade_id.to_string());

        let ids: Vec<Bson> = read_grades.into_iter().map(Bson::String).collect();
        self.store
            .merge_fields(
                store::READ_STATUS,
                principal_id,
                doc! {
                    "readGrades": ids,
                    "lastUpdated": Utc::now().to_rfc3339(),
                },
            )
            .await
    }

    /// Mark every unread item read, one write-back per item, all kinds
    /// routed through their respective mechanism, executed concurrently.
    ///
    /// Settle-all semantics: a failure to mark one item never prevents the
    /// others from being marked. Failures are logged and counted.
    pub async fn mark_all_read(&self, principal_id: &str, items: &[FeedItem]) -> MarkAllOutcome {
        let unread: Vec<&FeedItem> = items.iter().filter(|item| !item.read).collect();

        let writes = unread.iter().map(|item| {
            let source = item.source.clone();
            let item_id = item.id.clone();
            async move {
                match self.mark_read(principal_id, &source).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(item = %item_id, "Mark-read write failed: {}", e);
                        false
                    }
                }
            }
        });

        let results = join_all(writes).await;
        let succeeded = results.iter().filter(|ok| **ok).count();

        MarkAllOutcome {
            attempted: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}
