//! Trim step - cuts each staged clip to its time window.

use async_trait::async_trait;

use crate::ops::clip;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Produces `trimmed_<i>.mp4` from `input_<i>.mp4` by stream copy.
///
/// Inputs are deleted as soon as their trim succeeds to keep the
/// workspace small.
pub struct TrimStep;

impl TrimStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TrimStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineStep for TrimStep {
    fn name(&self) -> &str {
        "Trim"
    }

    fn description(&self) -> &str {
        "Cut each clip to its time window"
    }

    fn progress_span(&self) -> (u32, u32) {
        (35, 65)
    }

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.staged.len() != ctx.job.clips.len() {
            return Err(StepError::invalid_input(format!(
                "{} clips but {} staged inputs",
                ctx.job.clips.len(),
                state.staged.len()
            )));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let total = ctx.job.clips.len();

        for (i, spec) in ctx.job.clips.iter().enumerate() {
            let input = state.staged[i].clone();
            let output = ctx.workspace.name(&format!("trimmed_{}.mp4", i));
            state.track(&output);

            ctx.logger.info(&format!(
                "Trimming clip {} to {}s..{}s",
                i + 1,
                spec.start,
                spec.end
            ));
            clip::trim(&ctx.workspace, &ctx.logger, &input, &output, spec.start, spec.end)
                .await?;
            state.trimmed.push(output);

            match ctx.workspace.delete(&input).await {
                Ok(()) => {
                    state.scratch.forget(&input);
                }
                Err(e) => ctx
                    .logger
                    .debug(&format!("Keeping {} for cleanup: {}", input, e)),
            }

            ctx.report_progress(self.name(), i + 1, total, &format!("Trimmed clip {}/{}", i + 1, total));
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.trimmed.len() != ctx.job.clips.len() {
            return Err(StepError::invalid_output(format!(
                "trimmed {} of {} clips",
                state.trimmed.len(),
                ctx.job.clips.len()
            )));
        }
        Ok(())
    }
}
