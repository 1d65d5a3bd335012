//! Pipeline orchestrator for assembling episodes.
//!
//! # Architecture
//!
//! ```text
//! Assembler (acquire engine, build context, spawn the run, 100 on output)
//!   └── Pipeline
//!         ├── Step: Stage     fetch clips          5 → 35
//!         ├── Step: Trim      cut windows         35 → 65
//!         ├── Step: Concat    join in order       65 → 75
//!         ├── Step: Mix       overlay audio       75 → 95 (optional)
//!         ├── Step: Finalize  read the result     95 → 99
//!         └── cleanup (always)
//! ```

mod assembler;
mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use assembler::Assembler;
pub use errors::{ErrorKind, PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{ConcatStep, FinalizeStep, MixStep, StageStep, TrimStep};
pub use types::{Context, JobState, ProgressCallback, ProgressTracker, StepOutcome};

/// Full assembly: trim every clip, join, mix audio, read the result.
pub fn create_assembly_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(StageStep::new())
        .with_step(TrimStep::new())
        .with_step(ConcatStep::new())
        .with_step(MixStep::new())
        .with_step(FinalizeStep::new())
}

/// Trim a single clip.
pub fn create_trim_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(StageStep::new())
        .with_step(TrimStep::new())
        .with_step(FinalizeStep::new())
}

/// Join whole clips without trimming.
pub fn create_merge_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(StageStep::new())
        .with_step(ConcatStep::new())
        .with_step(FinalizeStep::new())
}
