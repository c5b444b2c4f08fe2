//! History service façade
//!
//! Orchestrates checkpointing, listing, reconstruction, restore and
//! deletion over injected store handles. One service instance serializes
//! writers per (owner, document) series, so the read-latest,
//! compute-next-sequence, insert section of a checkpoint cannot interleave
//! with another writer of the same series.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::config::HistoryConfig;
use crate::diff::EditScript;
use crate::document::DocumentStore;
use crate::error::{HistoryError, HistoryResult};
use crate::identity::IdentityResolver;
use crate::resolver::Resolver;
use crate::retention::{RetentionManager, SweepOutcome};
use crate::storage::HistoryStore;
use crate::types::{CheckpointOutcome, NewVersion, OwnerId, VersionSummary, content_digest};

/// High-level API of the version-history engine
pub struct HistoryService {
    config: HistoryConfig,
    store: Arc<dyn HistoryStore>,
    identity: Arc<dyn IdentityResolver>,
    documents: Arc<dyn DocumentStore>,
    resolver: Resolver,
    retention: RetentionManager,
    /// Per-series writer locks
    series_locks: DashMap<(OwnerId, String), Arc<Mutex<()>>>,
}

impl HistoryService {
    /// Create a service over the injected collaborators
    pub fn new(
        config: HistoryConfig,
        store: Arc<dyn HistoryStore>,
        identity: Arc<dyn IdentityResolver>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            resolver: Resolver::new(store.clone()),
            retention: RetentionManager::new(store.clone()),
            series_locks: DashMap::new(),
            config,
            store,
            identity,
            documents,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    async fn owner_id(&self, owner: &str) -> HistoryResult<OwnerId> {
        self.identity
            .resolve(owner)
            .await?
            .ok_or_else(|| HistoryError::unknown_owner(owner))
    }

    fn series_lock(&self, owner: OwnerId, document: &str) -> Arc<Mutex<()>> {
        self.series_locks
            .entry((owner, document.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Record a checkpoint of `content`.
    ///
    /// Returns [`CheckpointOutcome::Unchanged`] without writing when the
    /// content hash matches the latest version. The first
    /// `full_snapshot_count` versions of a series are stored full; later
    /// ones are stored as a diff against the previous version when the
    /// serialized script stays under half the content size.
    pub async fn checkpoint(
        &self,
        owner: &str,
        document: &str,
        content: &str,
    ) -> HistoryResult<CheckpointOutcome> {
        let owner_id = self.owner_id(owner).await?;
        let lock = self.series_lock(owner_id, document);
        let _guard = lock.lock().await;

        let latest = self.store.latest_version(owner_id, document).await?;

        if let Some(latest) = &latest {
            if latest.content_hash == content_digest(content) {
                tracing::debug!(
                    "content of {:?} unchanged since seq {}, skipping checkpoint",
                    document,
                    latest.sequence_number
                );
                return Ok(CheckpointOutcome::Unchanged);
            }
        }

        let next_sequence = latest.as_ref().map_or(1, |l| l.sequence_number + 1);

        let version = match &latest {
            Some(latest) if next_sequence > self.config.full_snapshot_count => {
                let previous = self.resolver.resolve(latest.id).await?;
                let script = EditScript::compute(&previous, content).to_json()?;
                if (script.len() as u64) * 2 < content.len() as u64 {
                    NewVersion::diff(owner_id, document, next_sequence, content, script, latest.id)
                } else {
                    NewVersion::full(owner_id, document, next_sequence, content)
                }
            }
            _ => NewVersion::full(owner_id, document, next_sequence, content),
        };

        let record = self.store.insert(version).await?;
        tracing::info!(
            "recorded version {} of {:?} for owner {} ({} bytes)",
            record.sequence_number,
            document,
            owner,
            record.content_length
        );

        self.retention
            .sweep(owner_id, document, self.config.keep_count)
            .await?;

        Ok(CheckpointOutcome::Created(record.sequence_number))
    }

    /// List a document's versions, most recent first, capped at the
    /// configured page size
    pub async fn list(&self, owner: &str, document: &str) -> HistoryResult<Vec<VersionSummary>> {
        let owner_id = self.owner_id(owner).await?;
        let records = self
            .store
            .list(owner_id, document, self.config.list_limit)
            .await?;

        Ok(records
            .iter()
            .enumerate()
            .map(|(idx, record)| VersionSummary::from_record(record, idx == 0))
            .collect())
    }

    /// Reconstruct the exact text of one historical version
    pub async fn version_content(
        &self,
        owner: &str,
        document: &str,
        sequence: u64,
    ) -> HistoryResult<String> {
        let owner_id = self.owner_id(owner).await?;
        let record = match self
            .store
            .version_by_sequence(owner_id, document, sequence)
            .await?
        {
            Some(record) => record,
            None => {
                return Err(if self.store.count(owner_id, document).await? == 0 {
                    HistoryError::unknown_document(document)
                } else {
                    HistoryError::not_found(format!("version {} of {:?}", sequence, document))
                });
            }
        };

        self.resolver.resolve(record.id).await
    }

    /// Resolve a historical version for a restore. The live document is not
    /// touched; the caller applies the returned text and decides whether to
    /// checkpoint the restored state.
    pub async fn restore(
        &self,
        owner: &str,
        document: &str,
        sequence: u64,
    ) -> HistoryResult<String> {
        let content = self.version_content(owner, document, sequence).await?;
        tracing::info!("resolved version {} of {:?} for restore", sequence, document);
        Ok(content)
    }

    /// Resolve a historical version and write it back to the live document
    /// store. No new version is recorded; checkpointing the restored state
    /// stays the caller's decision.
    pub async fn restore_into(
        &self,
        owner: &str,
        document: &str,
        sequence: u64,
    ) -> HistoryResult<String> {
        let content = self.version_content(owner, document, sequence).await?;
        self.documents.set_content(owner, document, &content).await?;
        tracing::info!("restored version {} of {:?} into the live document", sequence, document);
        Ok(content)
    }

    /// Delete one version. Refused with
    /// [`HistoryError::ReferencedByNewerVersion`] while any surviving diff
    /// uses it as a base; storage is left untouched in that case.
    pub async fn delete_version(
        &self,
        owner: &str,
        document: &str,
        sequence: u64,
    ) -> HistoryResult<()> {
        let owner_id = self.owner_id(owner).await?;
        let lock = self.series_lock(owner_id, document);
        let _guard = lock.lock().await;

        let record = self
            .store
            .version_by_sequence(owner_id, document, sequence)
            .await?
            .ok_or_else(|| {
                HistoryError::not_found(format!("version {} of {:?}", sequence, document))
            })?;

        if !self.store.dependents(record.id).await?.is_empty() {
            return Err(HistoryError::ReferencedByNewerVersion {
                sequence_number: sequence,
            });
        }

        self.store.delete_version(record.id).await?;
        tracing::info!("deleted version {} of {:?}", sequence, document);
        Ok(())
    }

    /// Delete a document's entire history, returning how many versions were
    /// removed. Always safe: nothing outside a series references into it.
    pub async fn delete_all(&self, owner: &str, document: &str) -> HistoryResult<u64> {
        let owner_id = self.owner_id(owner).await?;
        let lock = self.series_lock(owner_id, document);
        let _guard = lock.lock().await;

        let deleted = self.store.delete_series(owner_id, document).await?;
        tracing::info!("deleted all {} versions of {:?}", deleted, document);
        Ok(deleted)
    }

    /// Number of versions recorded for a document
    pub async fn count(&self, owner: &str, document: &str) -> HistoryResult<u64> {
        let owner_id = self.owner_id(owner).await?;
        self.store.count(owner_id, document).await
    }

    /// Run a retention sweep outside the checkpoint path, for host
    /// maintenance jobs
    pub async fn sweep(&self, owner: &str, document: &str) -> HistoryResult<SweepOutcome> {
        let owner_id = self.owner_id(owner).await?;
        let lock = self.series_lock(owner_id, document);
        let _guard = lock.lock().await;

        self.retention
            .sweep(owner_id, document, self.config.keep_count)
            .await
    }
}
