//! In-memory [`DocumentStore`] for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{DocumentMetadata, NewDocument};

use super::DocumentStore;

#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<String, DocumentMetadata>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("document store lock poisoned")
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, doc: &NewDocument) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut docs = self.docs.write().map_err(poisoned)?;
        docs.insert(
            id.clone(),
            DocumentMetadata {
                id: id.clone(),
                filename: doc.filename.clone(),
                upload_date: doc.upload_date,
            },
        );
        Ok(id)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<DocumentMetadata>> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.get(id).cloned())
    }
}
