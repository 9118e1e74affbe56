//! Stage identifiers shared by capture, comparison and reporting.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// One named step of the resource transfer pipeline.
///
/// The set is closed: every consumer matches on it exhaustively. The order in
/// which stages are *compared* is configured separately (see the stage plan in
/// `rd-compare`), so variant order here carries no root-cause meaning.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    /// Input payload before any transformation.
    Original,
    /// Payload after compression.
    Compressed,
    /// Random hash prepended to the (possibly compressed) payload.
    WithRandomPrefix,
    /// Link-encrypted stream.
    Encrypted,
    /// Transmission-sized segments of the encrypted stream.
    SegmentedParts,
    /// End-to-end output, expected to equal the original.
    Final,
}

/// Shape of the artifact a stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageKind {
    /// A single blob.
    Blob,
    /// An ordered sequence of blobs whose boundaries are significant.
    Parts,
}

impl Stage {
    pub fn kind(self) -> StageKind {
        match self {
            Stage::Original
            | Stage::Compressed
            | Stage::WithRandomPrefix
            | Stage::Encrypted
            | Stage::Final => StageKind::Blob,
            Stage::SegmentedParts => StageKind::Parts,
        }
    }

    /// Producer-side position used in dump file names (`stage<k>`).
    ///
    /// `Final` shares the original's slot: the reference side never stores a
    /// separate end-to-end artifact because it must equal the input.
    pub fn capture_index(self) -> u8 {
        match self {
            Stage::Original | Stage::Final => 0,
            Stage::Compressed => 1,
            Stage::WithRandomPrefix => 2,
            Stage::Encrypted => 3,
            Stage::SegmentedParts => 4,
        }
    }

    /// File stem used by the capture layout.
    pub fn file_stem(self) -> &'static str {
        match self {
            Stage::Original | Stage::Final => "original",
            Stage::Compressed => "compressed",
            Stage::WithRandomPrefix => "with_random",
            Stage::Encrypted => "encrypted",
            Stage::SegmentedParts => "parts",
        }
    }
}

/// Which implementation an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    /// The reference implementation, captured by instrumentation.
    Reference,
    /// The implementation under test.
    Candidate,
}

/// Test identifier: the pipeline input size in bytes, or a run number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(pub u64);

impl From<u64> for TestId {
    fn from(value: u64) -> Self {
        TestId(value)
    }
}

impl core::fmt::Display for TestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
