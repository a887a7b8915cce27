//! PostgreSQL-backed document store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};

use super::{DocumentStore, Result};
use crate::config::PoolSettings;

/// Get the bobactl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Document store over a single `documents` table keyed by `(collection, key)`
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .idle_timeout((settings.idle_timeout_secs > 0).then(|| Duration::from_secs(settings.idle_timeout_secs)))
            .max_lifetime((settings.max_lifetime_secs > 0).then(|| Duration::from_secs(settings.max_lifetime_secs)))
            .connect(url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        migrator().run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<serde_json::Value>> {
        let document = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            SELECT document FROM documents
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    async fn set(&self, collection: &str, key: &str, document: &serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, key, document)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET document = EXCLUDED.document, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists(&self, collection: &str, key: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM documents WHERE collection = $1 AND key = $2)
            "#,
        )
        .bind(collection)
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
