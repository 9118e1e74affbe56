//! Explicitly scoped capture buffer.

use std::collections::BTreeMap;

use rd_store::{Stage, StoreError, TestId};
use thiserror::Error;
use tracing::{debug, info};

use crate::hook::{CaptureHook, Inspect, PipelineFacts};

/// Single-blob stages the reference pipeline holds before cleanup.
pub const CAPTURED_STAGES: [Stage; 4] = [
    Stage::Original,
    Stage::Compressed,
    Stage::WithRandomPrefix,
    Stage::Encrypted,
];

/// Capture errors. None of these say anything about protocol corruption.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Instrumentation gap: stage {stage} was never populated by the pipeline")]
    InstrumentationGap { stage: Stage },

    #[error("Capture slot for session {session} already holds a construction; arm() before building again")]
    SlotOccupied { session: TestId },

    #[error("Capture context for session {session} was not armed before construction")]
    NotArmed { session: TestId },

    #[error("No pipeline construction was captured for session {session}")]
    Empty { session: TestId },

    #[error("Failed to persist capture: {0}")]
    Store(#[from] StoreError),
}

/// Owned copies of everything a single construction exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub session: TestId,
    pub stages: BTreeMap<Stage, Vec<u8>>,
    pub parts: Vec<Vec<u8>>,
    pub facts: PipelineFacts,
}

impl Capture {
    /// Copy the current state of `pipeline`.
    pub fn snapshot(session: TestId, pipeline: &dyn Inspect) -> Self {
        let mut stages = BTreeMap::new();
        for stage in CAPTURED_STAGES {
            match pipeline.intermediate(stage) {
                Some(data) => {
                    stages.insert(stage, data.to_vec());
                }
                None => debug!(%session, %stage, "stage not populated at capture point"),
            }
        }
        let parts = pipeline.parts().into_iter().map(<[u8]>::to_vec).collect();

        Self {
            session,
            stages,
            parts,
            facts: pipeline.facts(),
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&[u8]> {
        self.stages.get(&stage).map(Vec::as_slice)
    }

    /// Data of a stage that must have been populated.
    pub fn require(&self, stage: Stage) -> Result<&[u8], CaptureError> {
        self.stage(stage).ok_or(CaptureError::InstrumentationGap { stage })
    }
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Idle,
    Armed,
    Filled(Capture),
}

/// Single-slot capture buffer for one session.
///
/// The required sequence is `arm()`, construct the pipeline with this context
/// as its hook, then `take()`. A second construction without an intervening
/// `arm()` is rejected and leaves the first capture untouched.
#[derive(Debug)]
pub struct CaptureContext {
    session: TestId,
    slot: Slot,
}

impl CaptureContext {
    pub fn new(session: impl Into<TestId>) -> Self {
        Self {
            session: session.into(),
            slot: Slot::Idle,
        }
    }

    pub fn session(&self) -> TestId {
        self.session
    }

    /// Clear the slot and accept the next construction.
    pub fn arm(&mut self) {
        self.slot = Slot::Armed;
    }

    pub fn is_filled(&self) -> bool {
        matches!(self.slot, Slot::Filled(_))
    }

    /// Arm, then run `build` with this context as the pipeline's hook.
    pub fn instrument<T>(&mut self, build: impl FnOnce(&mut dyn CaptureHook) -> T) -> T {
        self.arm();
        build(self)
    }

    /// Remove the captured construction, leaving the context idle.
    pub fn take(&mut self) -> Result<Capture, CaptureError> {
        match std::mem::take(&mut self.slot) {
            Slot::Filled(capture) => Ok(capture),
            _ => Err(CaptureError::Empty {
                session: self.session,
            }),
        }
    }
}

impl CaptureHook for CaptureContext {
    fn after_construction(&mut self, pipeline: &dyn Inspect) -> Result<(), CaptureError> {
        match self.slot {
            Slot::Armed => {}
            Slot::Filled(_) => {
                return Err(CaptureError::SlotOccupied {
                    session: self.session,
                });
            }
            Slot::Idle => {
                return Err(CaptureError::NotArmed {
                    session: self.session,
                });
            }
        }

        let capture = Capture::snapshot(self.session, pipeline);
        info!(
            session = %self.session,
            stages = capture.stages.len(),
            parts = capture.parts.len(),
            "captured pipeline construction"
        );
        self.slot = Slot::Filled(capture);
        Ok(())
    }
}
