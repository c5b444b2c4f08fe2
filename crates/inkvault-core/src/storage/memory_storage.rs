//! In-memory version storage

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{HistoryError, HistoryResult};
use crate::types::{
    ContentPayload, NewVersion, OwnerId, PayloadEncoding, VersionId, VersionRecord,
};

use super::HistoryStore;

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<VersionId, VersionRecord>,
    payloads: HashMap<VersionId, ContentPayload>,
}

impl Inner {
    fn series<'a>(
        &'a self,
        owner: OwnerId,
        document: &'a str,
    ) -> impl Iterator<Item = &'a VersionRecord> {
        self.records
            .values()
            .filter(move |r| r.owner_id == owner && r.document_name == document)
    }
}

/// In-memory version store, for unit tests and embedded use
pub struct MemoryHistoryStore {
    inner: RwLock<Inner>,
}

impl MemoryHistoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn latest_version(
        &self,
        owner: OwnerId,
        document: &str,
    ) -> HistoryResult<Option<VersionRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .series(owner, document)
            .max_by_key(|r| r.sequence_number)
            .cloned())
    }

    async fn version_by_sequence(
        &self,
        owner: OwnerId,
        document: &str,
        sequence: u64,
    ) -> HistoryResult<Option<VersionRecord>> {
        let inner = self.inner.read().await;
        let result = inner
            .series(owner, document)
            .find(|r| r.sequence_number == sequence)
            .cloned();
        Ok(result)
    }

    async fn payload(&self, id: VersionId) -> HistoryResult<Option<ContentPayload>> {
        let inner = self.inner.read().await;
        Ok(inner.payloads.get(&id).cloned())
    }

    async fn insert(&self, version: NewVersion) -> HistoryResult<VersionRecord> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = VersionId(inner.next_id);
        let (record, payload) = version.into_parts(id);
        inner.records.insert(id, record.clone());
        inner.payloads.insert(id, payload);
        Ok(record)
    }

    async fn list(
        &self,
        owner: OwnerId,
        document: &str,
        limit: usize,
    ) -> HistoryResult<Vec<VersionRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<_> = inner.series(owner, document).cloned().collect();
        records.sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
        records.truncate(limit);
        Ok(records)
    }

    async fn count(&self, owner: OwnerId, document: &str) -> HistoryResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner.series(owner, document).count() as u64)
    }

    async fn dependents(&self, id: VersionId) -> HistoryResult<Vec<VersionId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payloads
            .values()
            .filter(|p| p.base_version_id == Some(id))
            .map(|p| p.version_id)
            .collect())
    }

    async fn promote_to_full(&self, id: VersionId, content: &str) -> HistoryResult<()> {
        let mut inner = self.inner.write().await;
        let payload = inner
            .payloads
            .get_mut(&id)
            .ok_or_else(|| HistoryError::not_found(format!("version {} has no payload", id)))?;
        payload.encoding = PayloadEncoding::Full;
        payload.payload = content.to_string();
        payload.base_version_id = None;
        Ok(())
    }

    async fn delete_version(&self, id: VersionId) -> HistoryResult<()> {
        let mut inner = self.inner.write().await;
        inner.records.remove(&id);
        inner.payloads.remove(&id);
        Ok(())
    }

    async fn delete_series(&self, owner: OwnerId, document: &str) -> HistoryResult<u64> {
        let mut inner = self.inner.write().await;
        let ids: Vec<VersionId> = inner.series(owner, document).map(|r| r.id).collect();
        for id in &ids {
            inner.records.remove(id);
            inner.payloads.remove(id);
        }
        Ok(ids.len() as u64)
    }
}
