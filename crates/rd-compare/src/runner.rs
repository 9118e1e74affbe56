//! Drives the comparator across every planned stage of one test.

use std::path::{Path, PathBuf};

use rd_store::{Stage, StageKind, StoreError, TestId, read_blob, read_parts};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::diff::{StageComparator, Verdict};
use crate::plan::{PlanError, PlannedStage, StagePlan};

/// Failures that abort a run. Protocol-level differences never end up here.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Filesystem error while reading artifacts: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Verdict for one planned stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub reference: String,
    pub candidate: String,
    pub verdict: Verdict,
}

/// All stage verdicts for one test id, in plan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    pub test_id: TestId,
    pub stages: Vec<StageResult>,
}

impl TestRun {
    /// Earliest stage, in plan order, whose verdict is not MATCH.
    pub fn first_failing(&self) -> Option<&StageResult> {
        self.stages.iter().find(|s| !s.verdict.is_match())
    }

    pub fn passed(&self) -> bool {
        self.first_failing().is_none()
    }

    pub fn result(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Pairs reference and candidate artifacts according to a [`StagePlan`].
#[derive(Debug, Clone)]
pub struct ComparisonRunner {
    plan: StagePlan,
    reference_root: PathBuf,
    candidate_root: PathBuf,
    comparator: StageComparator,
}

impl ComparisonRunner {
    pub fn new(
        plan: StagePlan,
        reference_root: impl Into<PathBuf>,
        candidate_root: impl Into<PathBuf>,
    ) -> Result<Self, RunError> {
        plan.validate()?;
        Ok(Self {
            plan,
            reference_root: reference_root.into(),
            candidate_root: candidate_root.into(),
            comparator: StageComparator::default(),
        })
    }

    pub fn with_comparator(mut self, comparator: StageComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    pub fn reference_root(&self) -> &Path {
        &self.reference_root
    }

    /// Compare every planned stage. A missing artifact only affects its own
    /// stage; every stage is always evaluated.
    pub fn run(&self, id: TestId) -> Result<TestRun, RunError> {
        let mut stages = Vec::with_capacity(self.plan.stages.len());
        for planned in self.plan.iter() {
            let result = self.compare_stage(planned, id)?;
            if result.verdict.is_match() {
                info!(stage = %result.stage, "{}", result.verdict);
            } else {
                warn!(stage = %result.stage, "{}", result.verdict);
            }
            stages.push(result);
        }

        let run = TestRun { test_id: id, stages };
        match run.first_failing() {
            Some(first) => warn!(test_id = %id, stage = %first.stage, "first failing stage"),
            None => info!(test_id = %id, "all stages match"),
        }
        Ok(run)
    }

    fn compare_stage(&self, planned: &PlannedStage, id: TestId) -> Result<StageResult, RunError> {
        let reference_path = planned.reference_path(&self.reference_root, id);
        let candidate_path = planned.candidate_path(&self.candidate_root, id);

        let verdict = match planned.stage.kind() {
            StageKind::Blob => {
                let reference = read_blob(&reference_path)?;
                let candidate = read_blob(&candidate_path)?;
                self.comparator
                    .compare(reference.as_deref(), candidate.as_deref())
            }
            StageKind::Parts => {
                let reference = read_parts(&reference_path)?;
                let candidate = read_parts(&candidate_path)?;
                self.comparator
                    .compare_parts(reference.as_deref(), candidate.as_deref())
            }
        };

        let reference = reference_path.display().to_string();
        let candidate = candidate_path.display().to_string();
        Ok(StageResult {
            stage: planned.stage,
            verdict: verdict.locate(&reference, &candidate),
            reference,
            candidate,
        })
    }
}
