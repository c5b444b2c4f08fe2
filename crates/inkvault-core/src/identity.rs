//! Identity resolution seam
//!
//! The engine never stores user handles; every series is keyed by the
//! stable [`OwnerId`] an external resolver maps the handle to.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::HistoryResult;
use crate::types::OwnerId;

/// Maps a user handle to a stable owner identifier
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a handle, `None` when no such user exists
    async fn resolve(&self, handle: &str) -> HistoryResult<Option<OwnerId>>;
}

#[derive(Default)]
struct Registry {
    next_id: i64,
    users: HashMap<String, OwnerId>,
}

/// In-memory identity resolver for tests and embedded use
pub struct MemoryIdentityResolver {
    registry: RwLock<Registry>,
}

impl MemoryIdentityResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Register a handle, returning its id. Registering an existing handle
    /// returns the id it already has.
    pub async fn register(&self, handle: impl Into<String>) -> OwnerId {
        let handle = handle.into();
        let mut registry = self.registry.write().await;
        if let Some(id) = registry.users.get(&handle) {
            return *id;
        }
        registry.next_id += 1;
        let id = OwnerId(registry.next_id);
        registry.users.insert(handle, id);
        id
    }
}

impl Default for MemoryIdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for MemoryIdentityResolver {
    async fn resolve(&self, handle: &str) -> HistoryResult<Option<OwnerId>> {
        let registry = self.registry.read().await;
        Ok(registry.users.get(handle).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let resolver = MemoryIdentityResolver::new();
        let alice = resolver.register("alice").await;
        let bob = resolver.register("bob").await;

        assert_ne!(alice, bob);
        assert_eq!(resolver.resolve("alice").await.unwrap(), Some(alice));
        assert_eq!(resolver.resolve("carol").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let resolver = MemoryIdentityResolver::new();
        let first = resolver.register("alice").await;
        let second = resolver.register("alice").await;
        assert_eq!(first, second);
    }
}
