//! In-process document store.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{DocumentStore, Result};

/// Document store backed by a concurrent map. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<(String, String), serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.documents.iter().filter(|entry| entry.key().0 == collection).count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self
            .documents
            .get(&(collection.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, collection: &str, key: &str, document: &serde_json::Value) -> Result<()> {
        self.documents
            .insert((collection.to_string(), key.to_string()), document.clone());
        Ok(())
    }

    async fn exists(&self, collection: &str, key: &str) -> Result<bool> {
        Ok(self.documents.contains_key(&(collection.to_string(), key.to_string())))
    }
}
