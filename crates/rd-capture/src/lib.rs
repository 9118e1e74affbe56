//! rd-capture: harvest intermediate state from an instrumented pipeline.
//!
//! A reference pipeline releases its intermediate buffers as soon as it no
//! longer needs them. It exposes them through [`Inspect`] and calls a
//! [`CaptureHook`] at the single point where everything is still populated:
//! after construction, before cleanup. [`CaptureContext`] is the hook that
//! copies those values out, and [`Capture::persist`] writes them to an
//! [`rd_store::ArtifactStore`].

pub mod context;
pub mod hook;
pub mod pattern;
pub mod persist;

pub use context::{CAPTURED_STAGES, Capture, CaptureContext, CaptureError};
pub use hook::{CaptureHook, Inspect, PipelineFacts};
pub use pattern::test_pattern;
pub use persist::CapturePolicy;
