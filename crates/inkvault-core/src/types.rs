//! Type definitions for the version-history engine
//!
//! A document's history is a series of [`VersionRecord`]s, one per
//! checkpoint, each paired 1:1 with a [`ContentPayload`] holding either the
//! full text or a line-level edit script against an earlier version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a document owner, assigned by the identity resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub i64);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque version identifier, unique and monotonically assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionId(pub i64);

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row per checkpoint of a (owner, document) series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Unique identifier assigned by the store
    pub id: VersionId,

    /// Owner of the document series
    pub owner_id: OwnerId,

    /// Document the series belongs to
    pub document_name: String,

    /// 1-based, strictly increasing per series
    pub sequence_number: u64,

    /// Hex SHA-256 digest of the full reconstructed text at this version
    pub content_hash: String,

    /// Byte length of the full reconstructed text
    pub content_length: u64,

    /// When the checkpoint was recorded
    pub created_at: DateTime<Utc>,
}

/// How a version's payload is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// Payload is the complete document text
    Full,
    /// Payload is a serialized edit script against `base_version_id`
    Diff,
}

impl std::fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Diff => write!(f, "diff"),
        }
    }
}

/// Content stored for one version, 1:1 with its [`VersionRecord`].
///
/// Invariant: when `encoding` is [`PayloadEncoding::Diff`], `base_version_id`
/// must reference a record that still exists and itself resolves, recursively,
/// to a full payload. Retention must never break this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPayload {
    /// Owning version
    pub version_id: VersionId,

    /// Payload encoding
    pub encoding: PayloadEncoding,

    /// Raw text if `full`; a serialized edit script if `diff`
    pub payload: String,

    /// Set iff `encoding` is `diff`
    pub base_version_id: Option<VersionId>,
}

/// A record+payload pair handed to the store for atomic insertion.
/// The store assigns the [`VersionId`].
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub owner_id: OwnerId,
    pub document_name: String,
    pub sequence_number: u64,
    pub content_hash: String,
    pub content_length: u64,
    pub created_at: DateTime<Utc>,
    pub encoding: PayloadEncoding,
    pub payload: String,
    pub base_version_id: Option<VersionId>,
}

impl NewVersion {
    /// Build a full-snapshot version of `content`
    pub fn full(
        owner_id: OwnerId,
        document_name: impl Into<String>,
        sequence_number: u64,
        content: &str,
    ) -> Self {
        Self {
            owner_id,
            document_name: document_name.into(),
            sequence_number,
            content_hash: content_digest(content),
            content_length: content.len() as u64,
            created_at: Utc::now(),
            encoding: PayloadEncoding::Full,
            payload: content.to_string(),
            base_version_id: None,
        }
    }

    /// Build a diff-encoded version. `content` is the full new text the
    /// script reconstructs to; hash and length describe it, not the script.
    pub fn diff(
        owner_id: OwnerId,
        document_name: impl Into<String>,
        sequence_number: u64,
        content: &str,
        script: String,
        base_version_id: VersionId,
    ) -> Self {
        Self {
            owner_id,
            document_name: document_name.into(),
            sequence_number,
            content_hash: content_digest(content),
            content_length: content.len() as u64,
            created_at: Utc::now(),
            encoding: PayloadEncoding::Diff,
            payload: script,
            base_version_id: Some(base_version_id),
        }
    }

    /// Split into the two persisted rows once the store has assigned an id
    pub fn into_parts(self, id: VersionId) -> (VersionRecord, ContentPayload) {
        let record = VersionRecord {
            id,
            owner_id: self.owner_id,
            document_name: self.document_name,
            sequence_number: self.sequence_number,
            content_hash: self.content_hash,
            content_length: self.content_length,
            created_at: self.created_at,
        };
        let payload = ContentPayload {
            version_id: id,
            encoding: self.encoding,
            payload: self.payload,
            base_version_id: self.base_version_id,
        };
        (record, payload)
    }
}

/// One entry of a history listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub sequence_number: u64,
    pub content_hash: String,
    pub content_length: u64,
    pub created_at: DateTime<Utc>,
    pub is_current: bool,
}

impl VersionSummary {
    /// Build a summary from a record
    pub fn from_record(record: &VersionRecord, is_current: bool) -> Self {
        Self {
            sequence_number: record.sequence_number,
            content_hash: record.content_hash.clone(),
            content_length: record.content_length,
            created_at: record.created_at,
            is_current,
        }
    }
}

/// Outcome of a checkpoint request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// A new version was recorded with this sequence number
    Created(u64),
    /// Content matched the latest version; nothing was written
    Unchanged,
}

impl CheckpointOutcome {
    /// Check whether the call was a dedup no-op
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    /// Sequence number of the created version, if one was created
    pub fn sequence_number(&self) -> Option<u64> {
        match self {
            Self::Created(sequence) => Some(*sequence),
            Self::Unchanged => None,
        }
    }
}

/// Compute the lowercase hex SHA-256 digest of `content`
pub fn content_digest(content: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_digest() {
        assert_eq!(
            content_digest("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(content_digest(""), content_digest(""));
        assert_ne!(content_digest("a"), content_digest("b"));
    }

    #[test]
    fn test_new_version_full() {
        let version = NewVersion::full(OwnerId(1), "notes.md", 1, "line1\nline2");

        assert_eq!(version.encoding, PayloadEncoding::Full);
        assert_eq!(version.payload, "line1\nline2");
        assert_eq!(version.content_length, 11);
        assert_eq!(version.content_hash, content_digest("line1\nline2"));
        assert!(version.base_version_id.is_none());
    }

    #[test]
    fn test_new_version_diff_describes_content_not_script() {
        let script = r#"[["=","line1"],["+","line2"]]"#.to_string();
        let version = NewVersion::diff(OwnerId(1), "notes.md", 6, "line1\nline2", script, VersionId(5));

        assert_eq!(version.encoding, PayloadEncoding::Diff);
        assert_eq!(version.content_hash, content_digest("line1\nline2"));
        assert_eq!(version.content_length, 11);
        assert_eq!(version.base_version_id, Some(VersionId(5)));
    }

    #[test]
    fn test_into_parts() {
        let version = NewVersion::full(OwnerId(7), "doc", 3, "text");
        let (record, payload) = version.into_parts(VersionId(42));

        assert_eq!(record.id, VersionId(42));
        assert_eq!(record.sequence_number, 3);
        assert_eq!(payload.version_id, VersionId(42));
        assert_eq!(payload.payload, "text");
    }

    #[test]
    fn test_checkpoint_outcome() {
        assert!(CheckpointOutcome::Unchanged.is_unchanged());
        assert!(!CheckpointOutcome::Created(4).is_unchanged());
        assert_eq!(CheckpointOutcome::Created(4).sequence_number(), Some(4));
        assert_eq!(CheckpointOutcome::Unchanged.sequence_number(), None);
    }

    #[test]
    fn test_payload_encoding_display() {
        assert_eq!(PayloadEncoding::Full.to_string(), "full");
        assert_eq!(PayloadEncoding::Diff.to_string(), "diff");
    }
}
