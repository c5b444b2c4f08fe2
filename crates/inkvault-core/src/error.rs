//! Error types for the version-history engine

use thiserror::Error;

/// Result type alias for version-history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Main error type for the version-history engine
#[derive(Error, Debug, Clone)]
pub enum HistoryError {
    /// The owner handle could not be resolved to a user
    #[error("unknown owner: {0}")]
    UnknownOwner(String),

    /// The document has no recorded history
    #[error("unknown document: {0}")]
    UnknownDocument(String),

    /// A specific version is absent
    #[error("version not found: {0}")]
    NotFound(String),

    /// A diff chain cannot be resolved back to a full snapshot.
    /// This indicates stored-data corruption and is never masked.
    #[error("broken version chain: {0}")]
    BrokenChain(String),

    /// Deletion refused because a newer version's diff depends on this one
    #[error("version {sequence_number} is referenced by a newer version")]
    ReferencedByNewerVersion { sequence_number: u64 },

    /// Wrapped error from the persistence layer
    #[error("storage error: {0}")]
    Storage(String),
}

impl HistoryError {
    /// Create a new unknown-owner error
    pub fn unknown_owner(handle: impl Into<String>) -> Self {
        Self::UnknownOwner(handle.into())
    }

    /// Create a new unknown-document error
    pub fn unknown_document(document: impl Into<String>) -> Self {
        Self::UnknownDocument(document.into())
    }

    /// Create a new not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a new broken-chain error
    pub fn broken_chain(message: impl Into<String>) -> Self {
        Self::BrokenChain(message.into())
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

impl From<std::io::Error> for HistoryError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(error: serde_json::Error) -> Self {
        Self::Storage(format!("serialization failed: {}", error))
    }
}

impl From<anyhow::Error> for HistoryError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(error.to_string())
    }
}
