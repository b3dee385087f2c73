//! Extracted-text cache keyed by filename.
//!
//! The [`TextCache`] trait lets the service swap the process-local
//! [`InMemoryTextCache`] for a persistent backend. Entries are
//! last-write-wins per filename and are never evicted.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

#[async_trait]
pub trait TextCache: Send + Sync {
    /// Returns the cached text for `filename`, if any.
    async fn get(&self, filename: &str) -> Result<Option<String>>;

    /// Stores `text` under `filename`, replacing any previous entry.
    async fn put(&self, filename: &str, text: String) -> Result<()>;

    /// Number of cached filenames.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// `HashMap` behind a `std::sync::RwLock`. The lock is never held across
/// an await point.
#[derive(Default)]
pub struct InMemoryTextCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryTextCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("text cache lock poisoned")
}

#[async_trait]
impl TextCache for InMemoryTextCache {
    async fn get(&self, filename: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(filename).cloned())
    }

    async fn put(&self, filename: &str, text: String) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(filename.to_string(), text);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.len())
    }
}
