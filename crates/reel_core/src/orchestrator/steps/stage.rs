//! Stage step - fetches every source clip into the engine workspace.

use async_trait::async_trait;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Writes each clip's source as `input_<i>.mp4`, in clip order.
pub struct StageStep;

impl StageStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StageStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineStep for StageStep {
    fn name(&self) -> &str {
        "Stage"
    }

    fn description(&self) -> &str {
        "Fetch source clips into the workspace"
    }

    fn progress_span(&self) -> (u32, u32) {
        (5, 35)
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if ctx.job.clips.is_empty() {
            return Err(StepError::invalid_input("Job has no clips"));
        }
        for clip in &ctx.job.clips {
            clip.validate().map_err(StepError::invalid_input)?;
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let total = ctx.job.clips.len();
        ctx.logger.info(&format!("Staging {} clip(s)", total));

        for (i, clip) in ctx.job.clips.iter().enumerate() {
            let bytes = ctx
                .fetcher
                .fetch(&clip.url)
                .await
                .map_err(|e| StepError::fetch(&clip.url, e))?;

            let name = ctx.workspace.name(&format!("input_{}.mp4", i));
            state.track(&name);
            ctx.workspace
                .write(&name, &bytes)
                .await
                .map_err(|e| StepError::engine(format!("stage {}", name), e))?;

            ctx.logger
                .debug(&format!("Staged {} as {} ({} bytes)", clip.url, name, bytes.len()));
            state.staged.push(name);
            ctx.report_progress(self.name(), i + 1, total, &format!("Fetched clip {}/{}", i + 1, total));
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.staged.len() != ctx.job.clips.len() {
            return Err(StepError::invalid_output(format!(
                "staged {} of {} clips",
                state.staged.len(),
                ctx.job.clips.len()
            )));
        }
        Ok(())
    }
}
