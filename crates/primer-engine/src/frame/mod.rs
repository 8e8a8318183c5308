//! Per-tick command orchestration.
//!
//! A tick is recorded into a [`FramePlan`] through [`FrameState`], validated
//! against the scene's manifest while recording, then replayed on the device by
//! [`execute_plan`]. [`FrameDriver`] ties this to the frame clock and the surface.

pub mod animation;
mod driver;
mod encode;
mod plan;
mod state;

pub use driver::{record_frame, FrameContext, FrameDriver, Scene, TickOutcome};
pub use encode::execute_plan;
pub use plan::{ColorTarget, FramePlan, FrameStats, FrameStep, LoadPolicy, PassCommand, PassPlan, Submission};
pub use state::{FrameState, PassRecorder};
