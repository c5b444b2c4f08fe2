//! Version storage backends
//!
//! The store owns the two persisted tables of the engine: version records
//! and their 1:1 content payloads. Implementations must insert a
//! record+payload pair atomically and assign ids monotonically.

use async_trait::async_trait;

use crate::error::HistoryResult;
use crate::types::{ContentPayload, NewVersion, OwnerId, VersionId, VersionRecord};

mod compression;
mod file_storage;
mod memory_storage;

pub use file_storage::FileHistoryStore;
pub use memory_storage::MemoryHistoryStore;


/// Trait for version-history storage backends
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Latest version of a series, by sequence number
    async fn latest_version(
        &self,
        owner: OwnerId,
        document: &str,
    ) -> HistoryResult<Option<VersionRecord>>;

    /// Look up one version of a series by sequence number
    async fn version_by_sequence(
        &self,
        owner: OwnerId,
        document: &str,
        sequence: u64,
    ) -> HistoryResult<Option<VersionRecord>>;

    /// Load the payload owned by a version
    async fn payload(&self, id: VersionId) -> HistoryResult<Option<ContentPayload>>;

    /// Insert a record+payload pair atomically, assigning the next id
    async fn insert(&self, version: NewVersion) -> HistoryResult<VersionRecord>;

    /// List a series, most recent first, at most `limit` entries
    async fn list(
        &self,
        owner: OwnerId,
        document: &str,
        limit: usize,
    ) -> HistoryResult<Vec<VersionRecord>>;

    /// Number of versions in a series
    async fn count(&self, owner: OwnerId, document: &str) -> HistoryResult<u64>;

    /// Ids of versions whose diff payload uses `id` as its base
    async fn dependents(&self, id: VersionId) -> HistoryResult<Vec<VersionId>>;

    /// Rewrite a version's payload in place as a full snapshot of
    /// `content`, keeping id and sequence number. Idempotent.
    async fn promote_to_full(&self, id: VersionId, content: &str) -> HistoryResult<()>;

    /// Remove one version and its payload. Removing an absent version is
    /// not an error.
    async fn delete_version(&self, id: VersionId) -> HistoryResult<()>;

    /// Remove an entire series, returning how many versions were removed
    async fn delete_series(&self, owner: OwnerId, document: &str) -> HistoryResult<u64>;
}
