//! Retention sweeps bounding per-document history growth
//!
//! A sweep keeps the newest `keep_count` versions of a series and deletes
//! the rest. Deleting blindly would sever diff chains: a retained version
//! whose chain passes through a deleted base becomes unreconstructable, and
//! so does everything stacked on top of it. Before deleting anything, the
//! sweep promotes every retained version that still depends on a doomed
//! base into a full snapshot, rewritten in place.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{HistoryError, HistoryResult};
use crate::resolver::{ResolveCache, Resolver};
use crate::storage::HistoryStore;
use crate::types::{OwnerId, PayloadEncoding, VersionId};

/// Result of one retention sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Versions deleted
    pub deleted: u64,
    /// Retained versions rewritten as full snapshots to keep their chains intact
    pub promoted: u64,
}

/// Enforces the per-series version budget
pub struct RetentionManager {
    store: Arc<dyn HistoryStore>,
    resolver: Resolver,
}

impl RetentionManager {
    /// Create a retention manager over a store handle
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        let resolver = Resolver::new(store.clone());
        Self { store, resolver }
    }

    /// Trim a series down to `keep_count` versions.
    ///
    /// Promotion happens before any deletion, while every base is still
    /// present, and is idempotent: if the sweep dies between promoting and
    /// deleting, re-running it converges to the same state.
    pub async fn sweep(
        &self,
        owner: OwnerId,
        document: &str,
        keep_count: usize,
    ) -> HistoryResult<SweepOutcome> {
        let all = self.store.list(owner, document, usize::MAX).await?;
        if all.len() <= keep_count {
            return Ok(SweepOutcome::default());
        }

        let (retained, doomed) = all.split_at(keep_count);
        let doomed_ids: HashSet<VersionId> = doomed.iter().map(|r| r.id).collect();

        // Oldest retained version first: once it is promoted, newer chains
        // that pass through it stop there and need no promotion of their own.
        let mut promoted = 0u64;
        let mut cache = ResolveCache::new();
        for record in retained.iter().rev() {
            if self.chain_reaches(record.id, &doomed_ids).await? {
                let content = self.resolver.resolve_cached(record.id, &mut cache).await?;
                self.store.promote_to_full(record.id, &content).await?;
                tracing::warn!(
                    "promoted version {} (seq {}) of {:?} to break a dependency on swept history",
                    record.id,
                    record.sequence_number,
                    document
                );
                promoted += 1;
            }
        }

        let mut deleted = 0u64;
        for record in doomed {
            self.store.delete_version(record.id).await?;
            deleted += 1;
        }

        tracing::debug!(
            "retention sweep of {:?} for owner {}: deleted {}, promoted {}",
            document,
            owner,
            deleted,
            promoted
        );
        Ok(SweepOutcome { deleted, promoted })
    }

    /// Whether the base chain of `id` passes through any of `doomed` before
    /// reaching a full snapshot
    async fn chain_reaches(
        &self,
        id: VersionId,
        doomed: &HashSet<VersionId>,
    ) -> HistoryResult<bool> {
        let mut visited: HashSet<VersionId> = HashSet::new();
        let mut current = id;

        loop {
            if !visited.insert(current) {
                return Err(HistoryError::broken_chain(format!(
                    "cycle in version chain at version {}",
                    current
                )));
            }

            let payload = self.store.payload(current).await?.ok_or_else(|| {
                HistoryError::broken_chain(format!("missing payload for version {}", current))
            })?;

            match payload.encoding {
                PayloadEncoding::Full => return Ok(false),
                PayloadEncoding::Diff => {
                    let base = payload.base_version_id.ok_or_else(|| {
                        HistoryError::broken_chain(format!(
                            "diff payload of version {} has no base reference",
                            current
                        ))
                    })?;
                    if doomed.contains(&base) {
                        return Ok(true);
                    }
                    current = base;
                }
            }
        }
    }
}
