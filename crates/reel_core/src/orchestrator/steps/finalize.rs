//! Finalize step - reads the finished video out of the workspace.

use async_trait::async_trait;

use crate::models::MediaBlob;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

pub struct FinalizeStep;

impl FinalizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FinalizeStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineStep for FinalizeStep {
    fn name(&self) -> &str {
        "Finalize"
    }

    fn description(&self) -> &str {
        "Read the finished video"
    }

    fn progress_span(&self) -> (u32, u32) {
        (95, 99)
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.final_name().is_none() {
            return Err(StepError::invalid_input("No finished video to read"));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let name = state
            .final_name()
            .map(str::to_string)
            .ok_or_else(|| StepError::invalid_input("No finished video to read"))?;

        let bytes = ctx
            .workspace
            .read(&name)
            .await
            .map_err(|e| StepError::engine(format!("read {}", name), e))?;

        ctx.logger
            .info(&format!("Read {} ({} bytes)", name, bytes.len()));
        state.output = Some(MediaBlob::mp4(bytes));
        ctx.report_progress(self.name(), 1, 1, "Output ready");
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.output {
            Some(ref blob) if !blob.is_empty() => Ok(()),
            Some(_) => Err(StepError::invalid_output("Finished video is empty")),
            None => Err(StepError::invalid_output("Finished video not recorded")),
        }
    }
}
