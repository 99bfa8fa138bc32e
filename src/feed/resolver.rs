//! Identity resolver
//!
//! Raw records reference foreign entities by id (the author of a message,
//! the course a grade belongs to). The resolver collects the distinct set
//! of referenced ids first and issues one batched point-read per distinct
//! id, concurrently. Looking up per record (N+1) is the defect this
//! component exists to prevent.
//!
//! A failed or missing individual lookup simply leaves the id out of the
//! map; consumers substitute "Unknown" at label time rather than aborting
//! the batch.

use std::collections::{BTreeSet, HashMap};

use futures::future::join_all;
use tracing::debug;

use crate::store::DocumentStore;

/// Cap on point reads per batch
pub const MAX_BATCH_LOOKUPS: usize = 50;

/// Batched id -> display label resolution
pub struct IdentityResolver<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Resolve labels for a set of ids in `collection`.
    ///
    /// `label_fields` are tried in order on each document; the first string
    /// field present wins. Duplicate ids collapse before any read is issued.
    pub async fn resolve(
        &self,
        collection: &str,
        ids: impl IntoIterator<Item = String>,
        label_fields: &[&str],
    ) -> HashMap<String, String> {
        let distinct: BTreeSet<String> = ids.into_iter().filter(|id| !id.is_empty()).collect();

        let lookups = distinct.into_iter().take(MAX_BATCH_LOOKUPS).map(|id| {
            let store = self.store;
            let collection = collection.to_string();
            async move {
                match store.get(&collection, &id).await {
                    Ok(Some(doc)) => {
                        let label = label_fields
                            .iter()
                            .find_map(|field| doc.data.get_str(field).ok())
                            .map(str::to_string)?;
                        Some((id, label))
                    }
                    Ok(None) => None,
                    Err(e) => {
                        debug!(%collection, %id, "Label lookup failed: {}", e);
                        None
                    }
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bson::doc;

    #[tokio::test]
    async fn test_distinct_ids_issue_one_read_each() {
        let store = MemoryStore::new();
        store.put("users", "t1", doc! { "displayName": "Ms. Smith" });
        store.put("users", "t2", doc! { "displayName": "Mr. Jones" });

        let resolver = IdentityResolver::new(&store);
        // Three references, two distinct authors
        let ids = vec!["t1".to_string(), "t2".to_string(), "t1".to_string()];
        let labels = resolver.resolve("users", ids, &["displayName", "email"]).await;

        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get("t1").map(String::as_str), Some("Ms. Smith"));
        // Exactly 2 point reads, not 3
        assert_eq!(store.stats().gets, 2);
    }

    #[tokio::test]
    async fn test_label_field_fallback_order() {
        let store = MemoryStore::new();
        store.put("users", "t1", doc! { "email": "smith@example.com" });

        let resolver = IdentityResolver::new(&store);
        let labels = resolver
            .resolve("users", vec!["t1".to_string()], &["displayName", "email"])
            .await;

        assert_eq!(
            labels.get("t1").map(String::as_str),
            Some("smith@example.com")
        );
    }

    #[tokio::test]
    async fn test_missing_document_omitted() {
        let store = MemoryStore::new();
        let resolver = IdentityResolver::new(&store);

        let labels = resolver
            .resolve("users", vec!["ghost".to_string()], &["displayName"])
            .await;
        assert!(labels.is_empty());
    }

    #[tokio::test]
    async fn test_empty_ids_filtered_out() {
        let store = MemoryStore::new();
        let resolver = IdentityResolver::new(&store);

        let labels = resolver
            .resolve("users", vec![String::new()], &["displayName"])
            .await;
        assert!(labels.is_empty());
        assert_eq!(store.stats().gets, 0);
    }

    #[tokio::test]
    async fn test_batch_cap() {
        let store = MemoryStore::new();
        for i in 0..80 {
            store.put("courses", &format!("c{:02}", i), doc! { "title": "Course" });
        }

        let resolver = IdentityResolver::new(&store);
        let ids = (0..80).map(|i| format!("c{:02}", i));
        let labels = resolver.resolve("courses", ids, &["title"]).await;

        assert_eq!(labels.len(), MAX_BATCH_LOOKUPS);
        assert_eq!(store.stats().gets as usize, MAX_BATCH_LOOKUPS);
    }
}
