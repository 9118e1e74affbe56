//! rd-store: artifact storage for differential pipeline diagnostics.
//!
//! Every intermediate stage of a transfer pipeline is dumped as an immutable
//! binary artifact keyed by (stage, test id). Both the reference capture and
//! the implementation under test write here; the comparison tools only read.

pub mod metadata;
pub mod stage;
pub mod store;

pub use metadata::{CaptureMetadata, sha256_hex, to_hex};
pub use stage::{Side, Stage, StageKind, TestId};
pub use store::{
    ArtifactStore, DEFAULT_PREFIX, StoreError, default_dump_dir, parse_part_index, part_file_name,
    read_blob, read_parts,
};
