//! Differential comparison of pipeline stage dumps.
//!
//! Compares the artifacts of a reference implementation against those of an
//! implementation under test, stage by stage, localizes the first differing
//! byte, and rolls per-test verdicts up into a pass/fail summary.

pub mod diff;
pub mod hexdump;
pub mod plan;
pub mod report;
pub mod runner;
pub mod summary;

pub use diff::{
    Absent, PartMismatch, Present, StageComparator, Status, Verdict, compare_blobs, compare_parts,
};
pub use plan::{PlanError, PlannedStage, StagePlan};
pub use runner::{ComparisonRunner, RunError, StageResult, TestRun};
pub use summary::{Summary, SummaryEntry};
