//! Per-test capture metadata record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::stage::TestId;

/// Hex-encoded SHA-256 of a byte slice.
pub fn sha256_hex(data: &[u8]) -> String {
    to_hex(&Sha256::digest(data))
}

/// Lowercase hex of a byte slice.
pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Structured summary written alongside the captured stages of one test id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub test_id: TestId,
    /// RFC 3339 capture time.
    pub timestamp: String,
    pub original_size: usize,
    pub original_sha256: String,
    /// Hex of at most the first 50 input bytes, for eyeballing.
    pub original_head: String,
    /// Equal to the original's size/hash when compression was not applied.
    pub compressed_size: usize,
    pub compressed_sha256: String,
    pub encrypted_size: Option<usize>,
    pub encrypted_sha256: Option<String>,
    pub random_hash: Option<String>,
    pub resource_hash: Option<String>,
    pub total_parts: usize,
    /// Segment data unit the producer used to split the stream, if known.
    pub sdu: Option<usize>,
    pub part_sizes: Vec<usize>,
    pub part_sha256: Vec<String>,
    pub is_compressed: bool,
    pub is_encrypted: bool,
}

impl CaptureMetadata {
    /// Number of bytes of the original kept in `original_head`.
    pub const HEAD_BYTES: usize = 50;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0xab, 0x7f]), "00ab7f");
    }
}
