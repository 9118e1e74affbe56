//! Stage plan: which artifacts to pair, and in which order.
//!
//! The order of a plan is the root-cause order: the first non-matching entry
//! is reported as the point where the two implementations diverge. It is
//! configuration, not convention, so a pipeline variant with new or reordered
//! stages only needs a new plan file.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rd_store::{Stage, TestId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder replaced by the test id in artifact locations.
pub const SIZE_PLACEHOLDER: &str = "{size}";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Cannot read stage plan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid stage plan: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Stage plan is empty")]
    Empty,

    #[error("Stage {0} appears more than once in the plan")]
    Duplicate(Stage),
}

/// A pair of artifact locations for one stage, relative to each side's root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStage {
    pub stage: Stage,
    pub reference: String,
    pub candidate: String,
}

impl PlannedStage {
    pub fn new(stage: Stage, reference: impl Into<String>, candidate: impl Into<String>) -> Self {
        Self {
            stage,
            reference: reference.into(),
            candidate: candidate.into(),
        }
    }

    pub fn reference_path(&self, root: &Path, id: TestId) -> PathBuf {
        root.join(resolve(&self.reference, id))
    }

    pub fn candidate_path(&self, root: &Path, id: TestId) -> PathBuf {
        root.join(resolve(&self.candidate, id))
    }
}

/// Substitute the test id into a location template.
pub fn resolve(template: &str, id: TestId) -> String {
    template.replace(SIZE_PLACEHOLDER, &id.to_string())
}

/// Ordered list of stage comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    pub stages: Vec<PlannedStage>,
}

impl Default for StagePlan {
    /// Reference capture (`py_*`, per size) against the receiver's dumps
    /// (`cpp_*`), in the order the receiver processes data.
    fn default() -> Self {
        Self {
            stages: vec![
                PlannedStage::new(Stage::SegmentedParts, "py_stage4_parts_{size}", "cpp_stage0_parts"),
                PlannedStage::new(
                    Stage::Encrypted,
                    "py_stage3_encrypted_{size}.bin",
                    "cpp_stage1_encrypted.bin",
                ),
                PlannedStage::new(
                    Stage::WithRandomPrefix,
                    "py_stage2_with_random_{size}.bin",
                    "cpp_stage2_decrypted.bin",
                ),
                PlannedStage::new(
                    Stage::Compressed,
                    "py_stage1_compressed_{size}.bin",
                    "cpp_stage3_stripped.bin",
                ),
                PlannedStage::new(
                    Stage::Original,
                    "py_stage0_original_{size}.bin",
                    "cpp_stage4_decompressed.bin",
                ),
                PlannedStage::new(Stage::Final, "py_stage0_original_{size}.bin", "cpp_stage5_final.bin"),
            ],
        }
    }
}

impl StagePlan {
    pub fn new(stages: Vec<PlannedStage>) -> Result<Self, PlanError> {
        let plan = Self { stages };
        plan.validate()?;
        Ok(plan)
    }

    /// Load a JSON plan file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let plan: StagePlan = serde_json::from_reader(BufReader::new(file))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.stages.is_empty() {
            return Err(PlanError::Empty);
        }
        let mut seen = HashSet::new();
        for planned in &self.stages {
            if !seen.insert(planned.stage) {
                return Err(PlanError::Duplicate(planned.stage));
            }
        }
        Ok(())
    }

    /// Position of a stage in root-cause order.
    pub fn position(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|p| p.stage == stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedStage> {
        self.stages.iter()
    }
}
