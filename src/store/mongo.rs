//! MongoDB implementation of the document-store boundary
//!
//! Pattern adapted from holo-host/rust/util_libs/db/src/mongodb

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures_util::StreamExt;
use mongodb::Client;
use tracing::{error, info};

use crate::store::{DocumentStore, StoredDoc};
use crate::types::{HeraldError, Result};

/// MongoDB-backed document store
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db_name: String,
}

impl MongoStore {
    /// Connect and verify the connection with a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| HeraldError::Store(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| HeraldError::Store(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.client.database(&self.db_name).collection(name)
    }
}

/// Extract a document's id as a string, whatever BSON shape it arrived in
fn doc_id(data: &Document) -> Option<String> {
    match data.get("_id") {
        Some(Bson::String(s)) => Some(s.clone()),
        Some(Bson::ObjectId(oid)) => Some(oid.to_hex()),
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
        limit: usize,
    ) -> Result<Vec<StoredDoc>> {
        let mut filter = Document::new();
        filter.insert(field, value);

        let cursor = self
            .collection(collection)
            .find(filter)
            .limit(limit as i64)
            .await
            .map_err(|e| HeraldError::Store(format!("Find failed: {}", e)))?;

        let docs: Vec<StoredDoc> = cursor
            .filter_map(|item| async {
                match item {
                    Ok(data) => {
                        let id = doc_id(&data)?;
                        Some(StoredDoc { id, data })
                    }
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDoc>> {
        let found = self
            .collection(collection)
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| HeraldError::Store(format!("Find failed: {}", e)))?;

        Ok(found.map(|data| StoredDoc {
            id: id.to_string(),
            data,
        }))
    }

    async fn update_fields(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        self.collection(collection)
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .await
            .map_err(|e| HeraldError::Store(format!("Update failed: {}", e)))?;

        Ok(())
    }

    async fn merge_fields(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        self.collection(collection)
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .upsert(true)
            .await
            .map_err(|e| HeraldError::Store(format!("Merge write failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running MongoDB instance.
    // The pipeline itself is exercised against MemoryStore in tests/.
}
