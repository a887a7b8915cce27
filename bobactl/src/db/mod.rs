//! Durable document storage.
//!
//! Orders are persisted through a deliberately small key-value contract: [`DocumentStore`]
//! exposes `get`, `set` and `exists` on JSON documents addressed by `(collection, key)`.
//! There are no transactions and no conditional writes. `set` is an upsert, so callers that
//! may race on the same key must write identical content (see [`crate::orders`]).
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local map, used for development and tests
//! - [`PostgresStore`]: `documents` table with a JSONB payload, for production
//!
//! The store is constructed once at startup from [`StoreConfig`](crate::config::StoreConfig)
//! and passed around as an `Arc<dyn DocumentStore>`; nothing reaches for a global handle.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

pub mod errors;
pub mod memory;
pub mod postgres;

pub use errors::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::config::StoreConfig;

/// Minimal document store contract
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, or `None` if nothing is stored under the key
    async fn get(&self, collection: &str, key: &str) -> Result<Option<serde_json::Value>>;

    /// Insert or replace the document stored under the key
    async fn set(&self, collection: &str, key: &str, document: &serde_json::Value) -> Result<()>;

    /// Whether a document is stored under the key
    async fn exists(&self, collection: &str, key: &str) -> Result<bool>;
}

/// Fetch and deserialize a typed document
pub async fn get_typed<T: DeserializeOwned>(store: &dyn DocumentStore, collection: &str, key: &str) -> Result<Option<T>> {
    store
        .get(collection, key)
        .await?
        .map(|value| {
            serde_json::from_value(value).map_err(|source| StoreError::Malformed {
                collection: collection.to_string(),
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

/// Serialize and upsert a typed document
pub async fn set_typed<T: Serialize>(store: &dyn DocumentStore, collection: &str, key: &str, document: &T) -> Result<()> {
    let value = serde_json::to_value(document).map_err(|source| StoreError::Malformed {
        collection: collection.to_string(),
        key: key.to_string(),
        source,
    })?;
    store.set(collection, key, &value).await
}

/// Build the configured store backend, running migrations for Postgres.
pub async fn connect(config: &StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory document store; orders will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::Postgres { url, pool } => {
            let store = PostgresStore::connect(url, pool).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}
