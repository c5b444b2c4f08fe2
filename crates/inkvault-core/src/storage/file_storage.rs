//! File-backed version storage
//!
//! Stores one JSON document per version under a base directory:
//!
//! ```text
//! base_path/
//!   meta.json            # id counter
//!   versions/
//!     {id}.json          # record + inline payload or blob reference
//!   blobs/
//!     {hash}.gz          # compressed payloads above the inline limit
//! ```
//!
//! Writing a version is a single file creation, which keeps the
//! record+payload pair atomic. Blobs are content-addressed by payload
//! digest, so identical payloads are stored once and promotion never
//! invalidates a blob another version still references.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::{HistoryError, HistoryResult};
use crate::types::{
    content_digest, ContentPayload, NewVersion, OwnerId, PayloadEncoding, VersionId, VersionRecord,
};

use super::compression::{compress_payload, decompress_payload};
use super::HistoryStore;

/// On-disk form of one version
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVersion {
    record: VersionRecord,
    encoding: PayloadEncoding,
    base_version_id: Option<VersionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    next_id: i64,
}

/// File-backed version store
pub struct FileHistoryStore {
    base_path: PathBuf,
    /// Payloads above this size are externalized into compressed blobs
    max_inline_size: usize,
    /// Cached id counter, lazily loaded from `meta.json`
    next_id: Mutex<Option<i64>>,
}

impl FileHistoryStore {
    /// Create a store rooted at `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            max_inline_size: 100 * 1024, // 100KB
            next_id: Mutex::new(None),
        }
    }

    /// Set the maximum inline payload size
    pub fn with_max_inline_size(mut self, size: usize) -> Self {
        self.max_inline_size = size;
        self
    }

    fn versions_dir(&self) -> PathBuf {
        self.base_path.join("versions")
    }

    fn blobs_dir(&self) -> PathBuf {
        self.base_path.join("blobs")
    }

    fn meta_path(&self) -> PathBuf {
        self.base_path.join("meta.json")
    }

    fn version_path(&self, id: VersionId) -> PathBuf {
        self.versions_dir().join(format!("{}.json", id))
    }

    fn blob_path(&self, payload_ref: &str) -> PathBuf {
        self.blobs_dir().join(format!("{}.gz", payload_ref))
    }

    async fn ensure_dirs(&self) -> HistoryResult<()> {
        fs::create_dir_all(self.versions_dir())
            .await
            .map_err(|e| HistoryError::storage(format!("failed to create versions dir: {}", e)))?;
        fs::create_dir_all(self.blobs_dir())
            .await
            .map_err(|e| HistoryError::storage(format!("failed to create blobs dir: {}", e)))?;
        Ok(())
    }

    /// Allocate the next id, persisting the counter. Falls back to scanning
    /// the versions directory when the store predates `meta.json`.
    async fn allocate_id(&self) -> HistoryResult<VersionId> {
        let mut guard = self.next_id.lock().await;
        let next = match *guard {
            Some(next) => next,
            None => self.load_next_id().await?,
        };
        let meta = StoreMeta { next_id: next + 1 };
        let json = serde_json::to_string(&meta)?;
        fs::write(self.meta_path(), json)
            .await
            .map_err(|e| HistoryError::storage(format!("failed to write store meta: {}", e)))?;
        *guard = Some(next + 1);
        Ok(VersionId(next))
    }

    async fn load_next_id(&self) -> HistoryResult<i64> {
        match fs::read_to_string(self.meta_path()).await {
            Ok(json) => {
                let meta: StoreMeta = serde_json::from_str(&json)?;
                Ok(meta.next_id)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let max_id = self
                    .scan()
                    .await?
                    .iter()
                    .map(|s| s.record.id.0)
                    .max()
                    .unwrap_or(0);
                Ok(max_id + 1)
            }
            Err(e) => Err(HistoryError::storage(format!(
                "failed to read store meta: {}",
                e
            ))),
        }
    }

    async fn read_stored(&self, id: VersionId) -> HistoryResult<Option<StoredVersion>> {
        match fs::read_to_string(self.version_path(id)).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HistoryError::storage(format!(
                "failed to read version {}: {}",
                id, e
            ))),
        }
    }

    async fn write_stored(&self, stored: &StoredVersion) -> HistoryResult<()> {
        let json = serde_json::to_string_pretty(stored)?;
        fs::write(self.version_path(stored.record.id), json)
            .await
            .map_err(|e| {
                HistoryError::storage(format!(
                    "failed to write version {}: {}",
                    stored.record.id, e
                ))
            })?;
        Ok(())
    }

    /// Load every stored version. The engine's series are small and bounded
    /// by retention, so a directory scan is the index.
    async fn scan(&self) -> HistoryResult<Vec<StoredVersion>> {
        let dir = self.versions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut stored = Vec::new();
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| HistoryError::storage(format!("failed to read versions dir: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HistoryError::storage(format!("failed to read dir entry: {}", e)))?
        {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let json = fs::read_to_string(&path).await.map_err(|e| {
                    HistoryError::storage(format!("failed to read {:?}: {}", path, e))
                })?;
                stored.push(serde_json::from_str(&json)?);
            }
        }

        Ok(stored)
    }

    async fn scan_series(&self, owner: OwnerId, document: &str) -> HistoryResult<Vec<StoredVersion>> {
        let mut stored = self.scan().await?;
        stored.retain(|s| s.record.owner_id == owner && s.record.document_name == document);
        Ok(stored)
    }

    /// Store a payload as a content-addressed compressed blob
    async fn store_blob(&self, payload: &str) -> HistoryResult<String> {
        let payload_ref = content_digest(payload);
        let path = self.blob_path(&payload_ref);

        if path.exists() {
            return Ok(payload_ref);
        }

        let compressed = compress_payload(payload)?;
        fs::write(&path, &compressed)
            .await
            .map_err(|e| HistoryError::storage(format!("failed to write blob: {}", e)))?;

        tracing::debug!(
            "stored blob {} ({} -> {} bytes)",
            payload_ref,
            payload.len(),
            compressed.len()
        );
        Ok(payload_ref)
    }

    async fn load_blob(&self, payload_ref: &str) -> HistoryResult<String> {
        let compressed = fs::read(self.blob_path(payload_ref)).await.map_err(|e| {
            HistoryError::storage(format!("failed to read blob {}: {}", payload_ref, e))
        })?;
        decompress_payload(&compressed)
    }

    /// Split a payload into inline text or a blob reference
    async fn externalize(&self, payload: String) -> HistoryResult<(Option<String>, Option<String>)> {
        if payload.len() > self.max_inline_size {
            let payload_ref = self.store_blob(&payload).await?;
            Ok((None, Some(payload_ref)))
        } else {
            Ok((Some(payload), None))
        }
    }

    /// Materialize the payload text of a stored version
    async fn payload_text(&self, stored: &StoredVersion) -> HistoryResult<String> {
        match (&stored.payload, &stored.payload_ref) {
            (Some(inline), _) => Ok(inline.clone()),
            (None, Some(payload_ref)) => self.load_blob(payload_ref).await,
            (None, None) => Err(HistoryError::storage(format!(
                "version {} has neither inline payload nor blob reference",
                stored.record.id
            ))),
        }
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn latest_version(
        &self,
        owner: OwnerId,
        document: &str,
    ) -> HistoryResult<Option<VersionRecord>> {
        Ok(self
            .scan_series(owner, document)
            .await?
            .into_iter()
            .max_by_key(|s| s.record.sequence_number)
            .map(|s| s.record))
    }

    async fn version_by_sequence(
        &self,
        owner: OwnerId,
        document: &str,
        sequence: u64,
    ) -> HistoryResult<Option<VersionRecord>> {
        Ok(self
            .scan_series(owner, document)
            .await?
            .into_iter()
            .find(|s| s.record.sequence_number == sequence)
            .map(|s| s.record))
    }

    async fn payload(&self, id: VersionId) -> HistoryResult<Option<ContentPayload>> {
        let stored = match self.read_stored(id).await? {
            Some(stored) => stored,
            None => return Ok(None),
        };
        let text = self.payload_text(&stored).await?;
        Ok(Some(ContentPayload {
            version_id: id,
            encoding: stored.encoding,
            payload: text,
            base_version_id: stored.base_version_id,
        }))
    }

    async fn insert(&self, version: NewVersion) -> HistoryResult<VersionRecord> {
        self.ensure_dirs().await?;

        let id = self.allocate_id().await?;
        let (record, payload) = version.into_parts(id);
        let (inline, payload_ref) = self.externalize(payload.payload).await?;

        let stored = StoredVersion {
            record: record.clone(),
            encoding: payload.encoding,
            base_version_id: payload.base_version_id,
            payload: inline,
            payload_ref,
        };
        self.write_stored(&stored).await?;

        tracing::debug!(
            "stored version {} (seq {}) of {:?} as {}",
            record.id,
            record.sequence_number,
            record.document_name,
            stored.encoding
        );
        Ok(record)
    }

    async fn list(
        &self,
        owner: OwnerId,
        document: &str,
        limit: usize,
    ) -> HistoryResult<Vec<VersionRecord>> {
        let mut records: Vec<_> = self
            .scan_series(owner, document)
            .await?
            .into_iter()
            .map(|s| s.record)
            .collect();
        records.sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
        records.truncate(limit);
        Ok(records)
    }

    async fn count(&self, owner: OwnerId, document: &str) -> HistoryResult<u64> {
        Ok(self.scan_series(owner, document).await?.len() as u64)
    }

    async fn dependents(&self, id: VersionId) -> HistoryResult<Vec<VersionId>> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .filter(|s| s.base_version_id == Some(id))
            .map(|s| s.record.id)
            .collect())
    }

    async fn promote_to_full(&self, id: VersionId, content: &str) -> HistoryResult<()> {
        self.ensure_dirs().await?;

        let mut stored = self
            .read_stored(id)
            .await?
            .ok_or_else(|| HistoryError::not_found(format!("version {} has no payload", id)))?;

        let (inline, payload_ref) = self.externalize(content.to_string()).await?;
        stored.encoding = PayloadEncoding::Full;
        stored.base_version_id = None;
        stored.payload = inline;
        stored.payload_ref = payload_ref;
        self.write_stored(&stored).await?;

        tracing::debug!("promoted version {} to a full snapshot", id);
        Ok(())
    }

    async fn delete_version(&self, id: VersionId) -> HistoryResult<()> {
        let path = self.version_path(id);
        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| HistoryError::storage(format!("failed to delete version: {}", e)))?;
            tracing::debug!("deleted version {}", id);
        }
        Ok(())
    }

    async fn delete_series(&self, owner: OwnerId, document: &str) -> HistoryResult<u64> {
        let stored = self.scan_series(owner, document).await?;
        let count = stored.len() as u64;
        for entry in stored {
            self.delete_version(entry.record.id).await?;
        }
        Ok(count)
    }
}
