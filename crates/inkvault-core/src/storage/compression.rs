//! Payload compression utilities for the file-backed store

use crate::error::{HistoryError, HistoryResult};

/// Compress a payload using gzip
pub(super) fn compress_payload(content: &str) -> HistoryResult<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content.as_bytes())
        .map_err(|e| HistoryError::storage(format!("failed to compress payload: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| HistoryError::storage(format!("failed to finish compression: {}", e)))
}

/// Decompress a gzip payload
pub(super) fn decompress_payload(compressed: &[u8]) -> HistoryResult<String> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decoder = GzDecoder::new(compressed);
    let mut decompressed = String::new();
    decoder
        .read_to_string(&mut decompressed)
        .map_err(|e| HistoryError::storage(format!("failed to decompress payload: {}", e)))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_round_trip() {
        let content = "line one\nline two\n".repeat(500);
        let compressed = compress_payload(&content).unwrap();
        assert!(compressed.len() < content.len());
        assert_eq!(decompress_payload(&compressed).unwrap(), content);
    }

    #[test]
    fn test_decompress_garbage_fails() {
        assert!(decompress_payload(b"definitely not gzip").is_err());
    }
}
