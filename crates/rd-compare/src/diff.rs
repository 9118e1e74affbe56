//! Byte-exact artifact comparison.
//!
//! Compares two same-stage artifacts, classifying the outcome into a
//! [`Verdict`] and localizing the first differing byte.

use rd_store::{Side, sha256_hex};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

use crate::hexdump::{DEFAULT_CONTEXT_BYTES, context_window, hex_context};

/// Classification of a comparison, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Match,
    Differ,
    SizeMismatch,
    PartCountMismatch,
    PartsDiffer,
    Missing,
}

/// An artifact that was expected but not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absent {
    pub side: Side,
    /// Filled in by the caller that knows where the artifact should have been.
    pub location: Option<String>,
}

impl core::fmt::Display for Absent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({})", self.side, location),
            None => write!(f, "{}", self.side),
        }
    }
}

/// Size and hash of the side that was found when the other was not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Present {
    pub side: Side,
    /// Bytes (for parts: total bytes across all parts).
    pub size: usize,
    pub sha256: String,
}

impl core::fmt::Display for Present {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} present, {} bytes", self.side, self.size)
    }
}

/// One positional pair of parts that did not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartMismatch {
    pub index: usize,
    pub reference_size: usize,
    pub candidate_size: usize,
    /// First differing offset inside the part; `None` for a pure size change.
    pub first_offset: Option<usize>,
}

/// Outcome of comparing one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Match {
        /// Bytes (for parts: total bytes across all parts).
        size: usize,
        part_count: Option<usize>,
        sha256: String,
    },
    Differ {
        offset: usize,
        reference_size: usize,
        candidate_size: usize,
        reference_sha256: String,
        candidate_sha256: String,
        reference_byte: u8,
        candidate_byte: u8,
        window_start: usize,
        window_end: usize,
        context: String,
    },
    SizeMismatch {
        reference_size: usize,
        candidate_size: usize,
        reference_sha256: String,
        candidate_sha256: String,
    },
    PartCountMismatch {
        reference_count: usize,
        candidate_count: usize,
        /// Total bytes and hash of the concatenated parts on each side.
        reference_size: usize,
        candidate_size: usize,
        reference_sha256: String,
        candidate_sha256: String,
    },
    PartsDiffer {
        part_count: usize,
        mismatches: Vec<PartMismatch>,
    },
    Missing {
        absent: Vec<Absent>,
        #[serde(default)]
        present: Option<Present>,
    },
}

impl Verdict {
    pub fn status(&self) -> Status {
        match self {
            Verdict::Match { .. } => Status::Match,
            Verdict::Differ { .. } => Status::Differ,
            Verdict::SizeMismatch { .. } => Status::SizeMismatch,
            Verdict::PartCountMismatch { .. } => Status::PartCountMismatch,
            Verdict::PartsDiffer { .. } => Status::PartsDiffer,
            Verdict::Missing { .. } => Status::Missing,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match { .. })
    }

    /// Attach the expected location of each absent artifact.
    pub fn locate(mut self, reference: &str, candidate: &str) -> Self {
        if let Verdict::Missing { absent, .. } = &mut self {
            for a in absent.iter_mut() {
                a.location = Some(match a.side {
                    Side::Reference => reference.to_string(),
                    Side::Candidate => candidate.to_string(),
                });
            }
        }
        self
    }

    /// One-line detail, as shown in summary tables.
    pub fn detail(&self) -> String {
        match self {
            Verdict::Match {
                size,
                part_count: Some(count),
                ..
            } => format!("{} parts, {} bytes", count, size),
            Verdict::Match { size, .. } => format!("Size: {} bytes", size),
            Verdict::Differ { offset, .. } => {
                format!("First diff at byte 0x{:08x} ({})", offset, offset)
            }
            Verdict::SizeMismatch {
                reference_size,
                candidate_size,
                ..
            } => format!("Reference: {} bytes, Candidate: {} bytes", reference_size, candidate_size),
            Verdict::PartCountMismatch {
                reference_count,
                candidate_count,
                ..
            } => format!("Reference: {} parts, Candidate: {} parts", reference_count, candidate_count),
            Verdict::PartsDiffer { mismatches, part_count } => {
                format!("{} of {} parts differ", mismatches.len(), part_count)
            }
            Verdict::Missing { absent, present } => {
                let names: Vec<String> = absent.iter().map(ToString::to_string).collect();
                match present {
                    Some(present) => format!("Missing: {}; {}", names.join(", "), present),
                    None => format!("Missing: {}", names.join(", ")),
                }
            }
        }
    }
}

impl core::fmt::Display for Verdict {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}] {}", self.status(), self.detail())
    }
}

/// Index of the first differing byte within the shared prefix.
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter().zip(b).position(|(x, y)| x != y)
}

/// MISSING verdict for a pair where at least one side is absent.
fn missing(reference: Option<&[u8]>, candidate: Option<&[u8]>) -> Verdict {
    let mut absent = Vec::new();
    let mut present = None;
    for (side, data) in [(Side::Reference, reference), (Side::Candidate, candidate)] {
        match data {
            Some(data) => {
                present = Some(Present {
                    side,
                    size: data.len(),
                    sha256: sha256_hex(data),
                })
            }
            None => absent.push(Absent {
                side,
                location: None,
            }),
        }
    }
    Verdict::Missing { absent, present }
}

fn joined<P: AsRef<[u8]>>(parts: &[P]) -> Vec<u8> {
    parts.iter().flat_map(|p| p.as_ref().iter().copied()).collect()
}

/// Byte comparator with a configurable hex context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageComparator {
    pub context_bytes: usize,
}

impl Default for StageComparator {
    fn default() -> Self {
        Self {
            context_bytes: DEFAULT_CONTEXT_BYTES,
        }
    }
}

impl StageComparator {
    pub fn new(context_bytes: usize) -> Self {
        Self { context_bytes }
    }

    /// Compare two blobs. Absence is never treated as an empty blob.
    pub fn compare(&self, reference: Option<&[u8]>, candidate: Option<&[u8]>) -> Verdict {
        let (reference, candidate) = match (reference, candidate) {
            (Some(r), Some(c)) => (r, c),
            (r, c) => return missing(r, c),
        };

        let reference_sha256 = sha256_hex(reference);
        let candidate_sha256 = sha256_hex(candidate);
        debug!(%reference_sha256, %candidate_sha256, "hashed artifacts");

        if reference == candidate {
            return Verdict::Match {
                size: reference.len(),
                part_count: None,
                sha256: reference_sha256,
            };
        }

        match first_difference(reference, candidate) {
            Some(offset) => {
                let window = context_window(
                    offset,
                    self.context_bytes,
                    reference.len().max(candidate.len()),
                );
                Verdict::Differ {
                    offset,
                    reference_size: reference.len(),
                    candidate_size: candidate.len(),
                    reference_sha256,
                    candidate_sha256,
                    reference_byte: reference[offset],
                    candidate_byte: candidate[offset],
                    window_start: window.start,
                    window_end: window.end,
                    context: hex_context(reference, candidate, offset, self.context_bytes),
                }
            }
            None => Verdict::SizeMismatch {
                reference_size: reference.len(),
                candidate_size: candidate.len(),
                reference_sha256,
                candidate_sha256,
            },
        }
    }

    /// Compare two part sequences positionally.
    ///
    /// A count mismatch invalidates the positional pairing, so no part is
    /// inspected in that case.
    pub fn compare_parts<P: AsRef<[u8]>>(
        &self,
        reference: Option<&[P]>,
        candidate: Option<&[P]>,
    ) -> Verdict {
        let (reference, candidate) = match (reference, candidate) {
            (Some(r), Some(c)) => (r, c),
            (r, c) => {
                let (r, c) = (r.map(joined), c.map(joined));
                return missing(r.as_deref(), c.as_deref());
            }
        };

        if reference.len() != candidate.len() {
            let (r, c) = (joined(reference), joined(candidate));
            return Verdict::PartCountMismatch {
                reference_count: reference.len(),
                candidate_count: candidate.len(),
                reference_size: r.len(),
                candidate_size: c.len(),
                reference_sha256: sha256_hex(&r),
                candidate_sha256: sha256_hex(&c),
            };
        }

        let mut mismatches = Vec::new();
        for (index, (r, c)) in reference.iter().zip(candidate).enumerate() {
            let (r, c) = (r.as_ref(), c.as_ref());
            if r != c {
                debug!(index, reference_size = r.len(), candidate_size = c.len(), "part mismatch");
                mismatches.push(PartMismatch {
                    index,
                    reference_size: r.len(),
                    candidate_size: c.len(),
                    first_offset: first_difference(r, c),
                });
            }
        }

        if mismatches.is_empty() {
            let all = joined(reference);
            Verdict::Match {
                size: all.len(),
                part_count: Some(reference.len()),
                sha256: sha256_hex(&all),
            }
        } else {
            Verdict::PartsDiffer {
                part_count: reference.len(),
                mismatches,
            }
        }
    }
}

/// [`StageComparator::compare`] with the default ±64 byte window.
pub fn compare_blobs(reference: Option<&[u8]>, candidate: Option<&[u8]>) -> Verdict {
    StageComparator::default().compare(reference, candidate)
}

/// [`StageComparator::compare_parts`] with the default window.
pub fn compare_parts<P: AsRef<[u8]>>(reference: Option<&[P]>, candidate: Option<&[P]>) -> Verdict {
    StageComparator::default().compare_parts(reference, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn some(data: &[u8]) -> Option<&[u8]> {
        Some(data)
    }

    #[test]
    fn test_identical_blobs_match() {
        let v = compare_blobs(some(b"abc"), some(b"abc"));
        assert_eq!(v.status(), Status::Match);
        assert!(matches!(v, Verdict::Match { size: 3, part_count: None, .. }));
    }

    #[test]
    fn test_empty_blobs_match() {
        assert!(compare_blobs(some(b""), some(b"")).is_match());
    }

    #[test]
    fn test_absent_is_missing_not_differ() {
        let v = compare_blobs(some(b"abc"), None);
        assert_eq!(
            v,
            Verdict::Missing {
                absent: vec![Absent {
                    side: Side::Candidate,
                    location: None
                }],
                present: Some(Present {
                    side: Side::Reference,
                    size: 3,
                    sha256: sha256_hex(b"abc"),
                }),
            }
        );
        assert_eq!(v.detail(), "Missing: candidate; reference present, 3 bytes");

        let v = compare_blobs(None, None).locate("r.bin", "c.bin");
        assert_eq!(v.detail(), "Missing: reference (r.bin), candidate (c.bin)");
    }

    #[test]
    fn test_missing_parts_record_present_side() {
        let parts: Vec<Vec<u8>> = vec![vec![1, 2], vec![3]];
        match compare_parts(None, Some(&parts[..])) {
            Verdict::Missing { absent, present } => {
                assert_eq!(absent.len(), 1);
                assert_eq!(absent[0].side, Side::Reference);
                let present = present.unwrap();
                assert_eq!(present.side, Side::Candidate);
                assert_eq!(present.size, 3);
                assert_eq!(present.sha256, sha256_hex(&[1, 2, 3]));
            }
            other => panic!("expected MISSING, got {}", other),
        }
    }

    #[test]
    fn test_empty_vs_absent_is_missing() {
        assert_eq!(compare_blobs(some(b""), None).status(), Status::Missing);
    }

    #[test]
    fn test_differ_records_bytes() {
        let v = compare_blobs(some(b"abcdef"), some(b"abXdef"));
        match v {
            Verdict::Differ {
                offset,
                reference_byte,
                candidate_byte,
                ..
            } => {
                assert_eq!(offset, 2);
                assert_eq!(reference_byte, b'c');
                assert_eq!(candidate_byte, b'X');
            }
            other => panic!("expected DIFFER, got {}", other),
        }
    }

    #[test]
    fn test_differ_at_first_byte() {
        let v = compare_blobs(some(b"Xbcdef"), some(b"abcdef"));
        match v {
            Verdict::Differ {
                offset,
                window_start,
                window_end,
                context,
                ..
            } => {
                assert_eq!(offset, 0);
                assert_eq!((window_start, window_end), (0, 6));
                assert!(context.contains("00000000:[58]"));
                assert!(context.contains("00000000:[61]"));
            }
            other => panic!("expected DIFFER, got {}", other),
        }
    }

    #[test]
    fn test_differ_at_last_byte() {
        let reference = vec![0x11u8; 200];
        let mut candidate = reference.clone();
        candidate[199] = 0x22;
        match compare_blobs(some(&reference), some(&candidate)) {
            Verdict::Differ {
                offset,
                reference_byte,
                candidate_byte,
                window_start,
                window_end,
                context,
                ..
            } => {
                assert_eq!(offset, 199);
                assert_eq!((reference_byte, candidate_byte), (0x11, 0x22));
                assert_eq!((window_start, window_end), (135, 200));
                assert!(context.contains("[11]"));
                assert!(context.contains("[22]"));
            }
            other => panic!("expected DIFFER, got {}", other),
        }
    }

    #[test]
    fn test_differ_beats_size_mismatch() {
        // Content divergence inside the shared prefix wins over the length change.
        let v = compare_blobs(some(b"abcdef"), some(b"abX"));
        assert_eq!(v.status(), Status::Differ);
    }

    #[test]
    fn test_part_count_mismatch_skips_pairs() {
        let a: Vec<Vec<u8>> = vec![vec![1]; 8];
        let b: Vec<Vec<u8>> = vec![vec![2]; 7];
        assert_eq!(
            compare_parts(Some(&a[..]), Some(&b[..])),
            Verdict::PartCountMismatch {
                reference_count: 8,
                candidate_count: 7,
                reference_size: 8,
                candidate_size: 7,
                reference_sha256: sha256_hex(&[1; 8]),
                candidate_sha256: sha256_hex(&[2; 7]),
            }
        );
    }

    #[test]
    fn test_parts_differ_lists_each_index() {
        let a: Vec<Vec<u8>> = vec![vec![1, 2], vec![3, 4], vec![5, 6]];
        let b: Vec<Vec<u8>> = vec![vec![1, 2], vec![3, 9], vec![5]];
        let v = compare_parts(Some(&a[..]), Some(&b[..]));
        assert_eq!(
            v,
            Verdict::PartsDiffer {
                part_count: 3,
                mismatches: vec![
                    PartMismatch {
                        index: 1,
                        reference_size: 2,
                        candidate_size: 2,
                        first_offset: Some(1)
                    },
                    PartMismatch {
                        index: 2,
                        reference_size: 2,
                        candidate_size: 1,
                        first_offset: None
                    },
                ]
            }
        );
    }

    #[test]
    fn test_verdict_json_is_tagged() {
        let v = Verdict::PartCountMismatch {
            reference_count: 8,
            candidate_count: 7,
            reference_size: 800,
            candidate_size: 700,
            reference_sha256: "aa".into(),
            candidate_sha256: "bb".into(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["status"], "PART_COUNT_MISMATCH");
        let back: Verdict = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }

    proptest! {
        #[test]
        fn prop_identical_blobs_match(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let copy = data.clone();
            match compare_blobs(some(&data), some(&copy)) {
                Verdict::Match { size, sha256, .. } => {
                    prop_assert_eq!(size, data.len());
                    prop_assert_eq!(sha256, sha256_hex(&data));
                }
                other => prop_assert!(false, "expected MATCH, got {}", other),
            }
        }

        #[test]
        fn prop_single_byte_change_is_located(
            data in prop::collection::vec(any::<u8>(), 1..512),
            pick in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let i = pick.index(data.len());
            let mut other = data.clone();
            other[i] ^= flip;
            match compare_blobs(some(&data), some(&other)) {
                Verdict::Differ { offset, window_start, window_end, .. } => {
                    prop_assert_eq!(offset, i);
                    prop_assert_eq!(window_start, i.saturating_sub(DEFAULT_CONTEXT_BYTES));
                    prop_assert_eq!(window_end, (i + DEFAULT_CONTEXT_BYTES).min(data.len()));
                }
                other => prop_assert!(false, "expected DIFFER, got {}", other),
            }
        }

        #[test]
        fn prop_strict_prefix_is_size_mismatch(
            data in prop::collection::vec(any::<u8>(), 1..512),
            pick in any::<prop::sample::Index>(),
        ) {
            let cut = pick.index(data.len());
            let v = compare_blobs(some(&data[..cut]), some(&data));
            prop_assert_eq!(v.status(), Status::SizeMismatch);
            let v = compare_blobs(some(&data), some(&data[..cut]));
            prop_assert_eq!(v.status(), Status::SizeMismatch);
        }

        #[test]
        fn prop_equal_part_sequences_match(
            parts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16),
        ) {
            let v = compare_parts(Some(&parts[..]), Some(&parts[..]));
            match v {
                Verdict::Match { part_count, .. } => prop_assert_eq!(part_count, Some(parts.len())),
                other => prop_assert!(false, "expected MATCH, got {}", other),
            }
        }

        #[test]
        fn prop_unequal_part_counts_never_pair(
            parts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 1..16),
        ) {
            let shorter = &parts[..parts.len() - 1];
            match compare_parts(Some(&parts[..]), Some(shorter)) {
                Verdict::PartCountMismatch { reference_count, candidate_count, .. } => {
                    prop_assert_eq!(reference_count, parts.len());
                    prop_assert_eq!(candidate_count, parts.len() - 1);
                }
                other => prop_assert!(false, "expected PART_COUNT_MISMATCH, got {}", other),
            }
        }
    }
}
