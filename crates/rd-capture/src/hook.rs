//! Instrumentation extension point.

use rd_store::Stage;
use serde::{Deserialize, Serialize};

use crate::context::CaptureError;

/// Values that outlive construction and describe how the pipeline ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFacts {
    pub random_hash: Option<Vec<u8>>,
    pub resource_hash: Option<Vec<u8>>,
    pub compressed: bool,
    pub encrypted: bool,
    /// Segment data unit used to split the encrypted stream.
    pub sdu: Option<usize>,
}

/// Read-only view over a pipeline's intermediate state.
///
/// Implemented by the pipeline itself. Values that were never produced, or
/// were already released, are reported as `None`.
pub trait Inspect {
    /// Output of a single-blob stage.
    fn intermediate(&self, stage: Stage) -> Option<&[u8]>;

    /// Segments in transmission order, boundaries intact.
    fn parts(&self) -> Vec<&[u8]>;

    fn facts(&self) -> PipelineFacts {
        PipelineFacts::default()
    }
}

/// Callback a pipeline invokes once construction has finished and before it
/// drops any intermediate buffer.
pub trait CaptureHook {
    fn after_construction(&mut self, pipeline: &dyn Inspect) -> Result<(), CaptureError>;
}

/// A hook that ignores everything, for uninstrumented runs.
impl CaptureHook for () {
    fn after_construction(&mut self, _pipeline: &dyn Inspect) -> Result<(), CaptureError> {
        Ok(())
    }
}
