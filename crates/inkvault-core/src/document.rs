//! Live document store seam
//!
//! The engine keeps its own reconstructed history and never reads the live
//! document; the only write-back is a restore applied through this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::HistoryResult;

/// Write access to the live per-user document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Overwrite the live content of `document` for `owner`
    async fn set_content(&self, owner: &str, document: &str, content: &str) -> HistoryResult<()>;
}

/// In-memory document store for tests and embedded use
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<(String, String), String>>,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Read back the live content, if any
    pub async fn content(&self, owner: &str, document: &str) -> Option<String> {
        let documents = self.documents.read().await;
        documents
            .get(&(owner.to_string(), document.to_string()))
            .cloned()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn set_content(&self, owner: &str, document: &str, content: &str) -> HistoryResult<()> {
        let mut documents = self.documents.write().await;
        documents.insert(
            (owner.to_string(), document.to_string()),
            content.to_string(),
        );
        Ok(())
    }
}
