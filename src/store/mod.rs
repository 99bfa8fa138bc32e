//! Document-store boundary
//!
//! The feed pipeline talks to the document store through the [`DocumentStore`]
//! trait: equality-filtered queries with a result limit, point reads by
//! document id, and two write shapes (field update, merge-write with upsert).
//!
//! Two implementations:
//!
//! - [`MongoStore`]: production store backed by MongoDB
//! - [`MemoryStore`]: in-memory store for dev mode and tests

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A raw document returned by the store, paired with its id
#[derive(Debug, Clone)]
pub struct StoredDoc {
    /// Document id within its collection
    pub id: String,
    /// Raw document fields
    pub data: Document,
}

/// Query-by-equality-with-limit plus point reads and write-back.
///
/// All methods operate on one collection at a time; cross-document
/// operations are not transactional.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find documents where `field == value`, bounded by `limit`
    async fn find(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
        limit: usize,
    ) -> Result<Vec<StoredDoc>>;

    /// Point read of a single document by id
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDoc>>;

    /// Set fields on an existing document
    async fn update_fields(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    /// Merge fields into a document, creating it if absent
    async fn merge_fields(&self, collection: &str, id: &str, fields: Document) -> Result<()>;
}

// Collection names consumed and written by the pipeline
pub const NOTIFICATIONS: &str = "notifications";
pub const MESSAGES: &str = "messages";
pub const GRADES: &str = "grades";
pub const READ_STATUS: &str = "notification_read_status";
pub const USERS: &str = "users";
pub const COURSES: &str = "courses";
