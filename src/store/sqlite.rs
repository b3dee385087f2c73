//! SQLite-backed [`DocumentStore`].
//!
//! Ids are UUID v4 strings generated here, never by the caller.
//! `upload_date` is stored as Unix milliseconds.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{Row, SqlitePool};

use crate::models::{DocumentMetadata, NewDocument};

use super::DocumentStore;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Wraps a pool whose schema has already been migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, doc: &NewDocument) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO documents (id, filename, upload_date) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&doc.filename)
            .bind(doc.upload_date.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<DocumentMetadata>> {
        let row = sqlx::query("SELECT id, filename, upload_date FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let millis: i64 = row.get("upload_date");
        let upload_date = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| anyhow!("invalid upload_date {} for document {}", millis, id))?;

        Ok(Some(DocumentMetadata {
            id: row.get("id"),
            filename: row.get("filename"),
            upload_date,
        }))
    }
}
