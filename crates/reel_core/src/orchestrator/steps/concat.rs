//! Concat step - joins the clips into one video.

use async_trait::async_trait;

use crate::ops::clip;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Writes a manifest and concatenates the clips into `final.mp4`.
///
/// Uses the trimmed clips when there are any, otherwise the staged inputs
/// (plain merge without trimming).
pub struct ConcatStep;

impl ConcatStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConcatStep {
    fn default() -> Self {
        Self::new()
    }
}

fn sources(state: &JobState) -> &[String] {
    if state.trimmed.is_empty() {
        &state.staged
    } else {
        &state.trimmed
    }
}

#[async_trait]
impl PipelineStep for ConcatStep {
    fn name(&self) -> &str {
        "Concat"
    }

    fn description(&self) -> &str {
        "Join clips in order"
    }

    fn progress_span(&self) -> (u32, u32) {
        (65, 75)
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if sources(state).is_empty() {
            return Err(StepError::invalid_input("No clips to concatenate"));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let inputs = sources(state).to_vec();
        let manifest = clip::concat_manifest(&inputs);

        let list = ctx.workspace.name("filelist.txt");
        state.track(&list);
        ctx.workspace
            .write(&list, manifest.as_bytes())
            .await
            .map_err(|e| StepError::engine("write concat manifest", e))?;

        let output = ctx.workspace.name("final.mp4");
        state.track(&output);
        ctx.logger
            .info(&format!("Concatenating {} clip(s)", inputs.len()));
        clip::concat(&ctx.workspace, &ctx.logger, &list, &output).await?;

        state.merged = Some(output);
        ctx.report_progress(self.name(), 1, 1, "Clips joined");
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.merged.is_none() {
            return Err(StepError::invalid_output("Concatenated file not recorded"));
        }
        Ok(())
    }
}
