//! Deterministic test payloads.

/// Repeating alphabet used as pipeline input; easy to spot in a hex dump.
pub const PATTERN: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// `size` bytes of [`PATTERN`], repeated and truncated.
pub fn test_pattern(size: usize) -> Vec<u8> {
    PATTERN.iter().copied().cycle().take(size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_wraps() {
        let data = test_pattern(40);
        assert_eq!(data.len(), 40);
        assert_eq!(&data[..3], b"ABC");
        assert_eq!(&data[36..], b"ABCD");
    }

    #[test]
    fn test_empty_pattern() {
        assert!(test_pattern(0).is_empty());
    }
}
