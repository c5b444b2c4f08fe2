//! Document version-history engine
//!
//! This crate records successive states of a named document owned by a
//! user, reconstructs any historical state on demand, and bounds storage
//! growth:
//! - Checkpoints deduplicated by content hash
//! - Full snapshots for young histories, line-level diffs when a serialized
//!   edit script is small enough to pay off
//! - Chain-based reconstruction back to the nearest full snapshot
//! - Retention sweeps that promote load-bearing versions instead of
//!   breaking diff chains
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use inkvault_core::{
//!     HistoryConfig, HistoryService, MemoryDocumentStore, MemoryHistoryStore,
//!     MemoryIdentityResolver,
//! };
//!
//! let store = Arc::new(MemoryHistoryStore::new());
//! let identity = Arc::new(MemoryIdentityResolver::new());
//! identity.register("alice").await;
//! let documents = Arc::new(MemoryDocumentStore::new());
//!
//! let service = HistoryService::new(HistoryConfig::default(), store, identity, documents);
//!
//! service.checkpoint("alice", "notes.md", "line1\nline2").await?;
//! service.checkpoint("alice", "notes.md", "line1\nlineX\nline2").await?;
//!
//! let history = service.list("alice", "notes.md").await?;
//! let original = service.version_content("alice", "notes.md", 1).await?;
//! ```
//!
//! # Storage
//!
//! Storage is injected as an [`HistoryStore`] handle. The bundled
//! [`FileHistoryStore`] lays versions out as:
//!
//! ```text
//! base_path/
//!   meta.json        # id counter
//!   versions/
//!     {id}.json      # version record + payload (or blob reference)
//!   blobs/
//!     {hash}.gz      # compressed payloads above the inline limit
//! ```
//!
//! External collaborators stay behind traits: an [`IdentityResolver`] maps
//! user handles to stable ids, and a [`DocumentStore`] receives the
//! write-back when a restore is applied to the live document.

pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod identity;
pub mod resolver;
pub mod retention;
pub mod service;
pub mod storage;
pub mod types;

pub use config::HistoryConfig;
pub use diff::{EditOp, EditScript};
pub use document::{DocumentStore, MemoryDocumentStore};
pub use error::{HistoryError, HistoryResult};
pub use identity::{IdentityResolver, MemoryIdentityResolver};
pub use resolver::{ResolveCache, Resolver};
pub use retention::{RetentionManager, SweepOutcome};
pub use service::HistoryService;
pub use storage::{FileHistoryStore, HistoryStore, MemoryHistoryStore};
pub use types::{
    content_digest, CheckpointOutcome, ContentPayload, NewVersion, OwnerId, PayloadEncoding,
    VersionId, VersionRecord, VersionSummary,
};
