//! Reconstruction of historical content from version chains
//!
//! A diff-encoded version only holds an edit script; its text is defined by
//! the chain of base references down to the nearest full snapshot. The
//! resolver walks that chain iteratively, then replays the collected
//! scripts forward. Any gap in the chain is stored-data corruption and
//! surfaces as [`HistoryError::BrokenChain`](crate::error::HistoryError).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::diff::EditScript;
use crate::error::{HistoryError, HistoryResult};
use crate::storage::HistoryStore;
use crate::types::{PayloadEncoding, VersionId};

/// Memo of already-reconstructed versions, shared across resolutions that
/// walk overlapping chains (retention resolves many siblings at once)
pub type ResolveCache = HashMap<VersionId, String>;

/// Resolves a version id to its full reconstructed text
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn HistoryStore>,
}

impl Resolver {
    /// Create a resolver over a store handle
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Reconstruct the full text of one version
    pub async fn resolve(&self, id: VersionId) -> HistoryResult<String> {
        let mut cache = ResolveCache::new();
        self.resolve_cached(id, &mut cache).await
    }

    /// Reconstruct the full text of one version, reusing and feeding `cache`
    pub async fn resolve_cached(
        &self,
        id: VersionId,
        cache: &mut ResolveCache,
    ) -> HistoryResult<String> {
        if let Some(text) = cache.get(&id) {
            return Ok(text.clone());
        }

        // Walk base references down to a full snapshot (or a cached text),
        // collecting the scripts that will rebuild the requested version.
        let mut pending: Vec<(VersionId, EditScript)> = Vec::new();
        let mut visited: HashSet<VersionId> = HashSet::new();
        let mut current = id;

        let mut text = loop {
            if let Some(text) = cache.get(&current) {
                break text.clone();
            }
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
                PayloadEncoding::Full => {
                    cache.insert(current, payload.payload.clone());
                    break payload.payload;
                }
                PayloadEncoding::Diff => {
                    let base = payload.base_version_id.ok_or_else(|| {
                        HistoryError::broken_chain(format!(
                            "diff payload of version {} has no base reference",
                            current
                        ))
                    })?;
                    let script = EditScript::from_json(&payload.payload)?;
                    pending.push((current, script));
                    current = base;
                }
            }
        };

        // Replay forward, memoizing every intermediate state
        for (version, script) in pending.into_iter().rev() {
            text = script.apply(&text)?;
            cache.insert(version, text.clone());
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryHistoryStore;
    use crate::types::{NewVersion, OwnerId};

    const OWNER: OwnerId = OwnerId(1);
    const DOC: &str = "notes.md";

    fn diff_version(sequence: u64, old: &str, new: &str, base: VersionId) -> NewVersion {
        let script = EditScript::compute(old, new).to_json().unwrap();
        NewVersion::diff(OWNER, DOC, sequence, new, script, base)
    }

    #[tokio::test]
    async fn test_resolve_full_snapshot() {
        let store = Arc::new(MemoryHistoryStore::new());
        let record = store
            .insert(NewVersion::full(OWNER, DOC, 1, "line1\nline2"))
            .await
            .unwrap();

        let resolver = Resolver::new(store);
        assert_eq!(resolver.resolve(record.id).await.unwrap(), "line1\nline2");
    }

    #[tokio::test]
    async fn test_resolve_diff_chain() {
        let store = Arc::new(MemoryHistoryStore::new());
        let v1 = store
            .insert(NewVersion::full(OWNER, DOC, 1, "a\nb"))
            .await
            .unwrap();
        let v2 = store
            .insert(diff_version(2, "a\nb", "a\nx\nb", v1.id))
            .await
            .unwrap();
        let v3 = store
            .insert(diff_version(3, "a\nx\nb", "a\nx\nb\nc", v2.id))
            .await
            .unwrap();

        let resolver = Resolver::new(store);
        assert_eq!(resolver.resolve(v3.id).await.unwrap(), "a\nx\nb\nc");
        assert_eq!(resolver.resolve(v2.id).await.unwrap(), "a\nx\nb");
        assert_eq!(resolver.resolve(v1.id).await.unwrap(), "a\nb");
    }

    #[tokio::test]
    async fn test_resolve_missing_base_is_broken_chain() {
        let store = Arc::new(MemoryHistoryStore::new());
        let record = store
            .insert(diff_version(2, "a", "b", VersionId(999)))
            .await
            .unwrap();

        let resolver = Resolver::new(store);
        let err = resolver.resolve(record.id).await.unwrap_err();
        assert!(matches!(err, HistoryError::BrokenChain(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_resolve_missing_version_is_broken_chain() {
        let store = Arc::new(MemoryHistoryStore::new());
        let resolver = Resolver::new(store);
        let err = resolver.resolve(VersionId(1)).await.unwrap_err();
        assert!(matches!(err, HistoryError::BrokenChain(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_resolve_cycle_is_broken_chain() {
        let store = Arc::new(MemoryHistoryStore::new());
        // The memory store assigns ids from 1, so a first insert whose base
        // is id 1 references itself.
        let record = store
            .insert(diff_version(1, "a", "b", VersionId(1)))
            .await
            .unwrap();
        assert_eq!(record.id, VersionId(1));

        let resolver = Resolver::new(store);
        let err = resolver.resolve(record.id).await.unwrap_err();
        assert!(matches!(err, HistoryError::BrokenChain(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_resolve_cache_reused_across_calls() {
        let store = Arc::new(MemoryHistoryStore::new());
        let v1 = store
            .insert(NewVersion::full(OWNER, DOC, 1, "a"))
            .await
            .unwrap();
        let v2 = store
            .insert(diff_version(2, "a", "a\nb", v1.id))
            .await
            .unwrap();
        let v3 = store
            .insert(diff_version(3, "a\nb", "a\nb\nc", v2.id))
            .await
            .unwrap();

        let resolver = Resolver::new(store.clone());
        let mut cache = ResolveCache::new();
        resolver.resolve_cached(v3.id, &mut cache).await.unwrap();
        assert_eq!(cache.len(), 3);

        // A second resolution is served from the memo even if the stored
        // chain disappears underneath it.
        store.delete_version(v1.id).await.unwrap();
        assert_eq!(
            resolver.resolve_cached(v2.id, &mut cache).await.unwrap(),
            "a\nb"
        );
    }
}
