//! Storage abstraction for upload metadata.
//!
//! The [`DocumentStore`] trait is the only persistence the service needs:
//! insert a record and get back a store-assigned id, or look one up by id.
//! No update or delete is exposed.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`SqliteDocumentStore`] | Production; `documents` table via `sqlx` |
//! | [`InMemoryDocumentStore`] | Tests and embedding |

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DocumentMetadata, NewDocument};

pub use memory::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts `doc` and returns the freshly generated id.
    ///
    /// Every call yields a new id, even for identical records.
    async fn insert(&self, doc: &NewDocument) -> Result<String>;

    /// Retrieves a record by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<DocumentMetadata>>;
}
