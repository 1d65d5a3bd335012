//! Pipeline step trait definition.

use async_trait::async_trait;

use super::errors::StepResult;
use super::types::{Context, JobState, StepOutcome};

/// Trait for pipeline steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work
/// 3. `validate_output` - Verify the step produced valid output
///
/// Every workspace name a step creates must be recorded in
/// `state.scratch` before the engine is asked to create it.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Share of overall progress this step covers, as `(start, end)` percent.
    fn progress_span(&self) -> (u32, u32);

    /// Validate inputs before execution.
    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Execute the step's main work.
    ///
    /// Returns `StepOutcome::Skipped` if there is nothing to do (not an error).
    async fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome>;

    /// Validate outputs after a successful `execute`.
    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Whether this step may legitimately do nothing.
    fn is_optional(&self) -> bool {
        false
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}
