//! In-memory document store
//!
//! Used in dev mode when MongoDB is unreachable and by tests that exercise
//! the feed pipeline without a live database. Tracks operation counts so
//! tests can assert on query behavior (e.g. batched point reads).

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bson::{Bson, Document};
use dashmap::DashMap;

use crate::store::{DocumentStore, StoredDoc};
use crate::types::Result;

/// Operation counters for a [`MemoryStore`]
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Equality queries issued
    pub finds: AtomicU64,
    /// Point reads issued
    pub gets: AtomicU64,
    /// Writes issued (updates and merges)
    pub writes: AtomicU64,
}

/// Snapshot of store statistics
#[derive(Debug, Clone)]
pub struct StoreStatsSnapshot {
    pub finds: u64,
    pub gets: u64,
    pub writes: u64,
}

/// In-memory store: collection name -> document id -> document
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Document>>,
    stats: StoreStats,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document (test/dev seeding)
    pub fn put(&self, collection: &str, id: &str, data: Document) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    /// Read a document directly, bypassing stats (test assertions)
    pub fn peek(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .get(collection)
            .and_then(|coll| coll.get(id).map(|d| d.clone()))
    }

    /// Get operation counters
    pub fn stats(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            finds: self.stats.finds.load(Ordering::Relaxed),
            gets: self.stats.gets.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
        limit: usize,
    ) -> Result<Vec<StoredDoc>> {
        self.stats.finds.fetch_add(1, Ordering::Relaxed);

        let Some(coll) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut docs: Vec<StoredDoc> = coll
            .iter()
            .filter(|entry| entry.value().get(field) == Some(&value))
            .map(|entry| StoredDoc {
                id: entry.key().clone(),
                data: entry.value().clone(),
            })
            .collect();

        // Stable order so repeated queries agree
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs.truncate(limit);

        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDoc>> {
        self.stats.gets.fetch_add(1, Ordering::Relaxed);

        Ok(self.collections.get(collection).and_then(|coll| {
            coll.get(id).map(|d| StoredDoc {
                id: id.to_string(),
                data: d.clone(),
            })
        }))
    }

    async fn update_fields(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        self.stats.writes.fetch_add(1, Ordering::Relaxed);

        if let Some(coll) = self.collections.get(collection) {
            if let Some(mut existing) = coll.get_mut(id) {
                for (key, value) in fields {
                    existing.insert(key, value);
                }
            }
        }

        Ok(())
    }

    async fn merge_fields(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        self.stats.writes.fetch_add(1, Ordering::Relaxed);

        let coll = self
            .collections
            .entry(collection.to_string())
            .or_default();
        let mut existing = coll.entry(id.to_string()).or_default();
        for (key, value) in fields {
            existing.insert(key, value);
        }

        Ok(())
    }
}
