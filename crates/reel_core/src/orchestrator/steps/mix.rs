//! Mix step - overlays audio tracks onto the joined video.

use async_trait::async_trait;

use crate::models::AudioTrackSpec;
use crate::ops::mix::{audio_extension, mix_staged, MixOutcome};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Stages each usable audio track as `audio_<i><ext>` and mixes them over
/// `final.mp4` into `final_audio.mp4`.
///
/// Skipped when no track has a source.
pub struct MixStep;

impl MixStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MixStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineStep for MixStep {
    fn name(&self) -> &str {
        "Mix"
    }

    fn description(&self) -> &str {
        "Mix overlay audio into the video"
    }

    fn progress_span(&self) -> (u32, u32) {
        (75, 95)
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.merged.is_none() {
            return Err(StepError::invalid_input("No joined video to mix into"));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let tracks = ctx.job.usable_audio_tracks();
        let ignored = ctx.job.audio_tracks.len() - tracks.len();
        if ignored > 0 {
            ctx.logger
                .debug(&format!("Ignoring {} audio track(s) without a source", ignored));
        }
        if tracks.is_empty() {
            return Ok(StepOutcome::Skipped("no audio tracks to mix".to_string()));
        }

        let video = state
            .merged
            .clone()
            .ok_or_else(|| StepError::invalid_input("No joined video to mix into"))?;

        // Staging counts for most of the span; the mix command is one tick.
        let total = tracks.len() + 1;
        let mut staged: Vec<(String, AudioTrackSpec)> = Vec::with_capacity(tracks.len());
        for (i, track) in tracks.into_iter().enumerate() {
            let ext = audio_extension(&track.url, &ctx.settings.mixing.fallback_extension);
            let name = ctx.workspace.name(&format!("audio_{}{}", i, ext));

            let bytes = ctx
                .fetcher
                .fetch(&track.url)
                .await
                .map_err(|e| StepError::fetch(&track.url, e))?;
            state.track(&name);
            ctx.workspace
                .write(&name, &bytes)
                .await
                .map_err(|e| StepError::engine(format!("stage {}", name), e))?;

            staged.push((name, track));
            ctx.report_progress(self.name(), i + 1, total, &format!("Fetched audio track {}", i + 1));
        }

        let output = ctx.workspace.name("final_audio.mp4");
        state.track(&output);
        let outcome = mix_staged(
            &ctx.workspace,
            &ctx.logger,
            &ctx.settings.mixing,
            &video,
            &staged,
            &output,
        )
        .await?;

        for (name, _) in &staged {
            if ctx.workspace.delete(name).await.is_ok() {
                state.scratch.forget(name);
            }
        }

        match outcome {
            MixOutcome::Mixed { output, inputs } => {
                ctx.logger
                    .info(&format!("Mixed {} audio stream(s)", inputs));
                state.mixed = Some(output);
                ctx.report_progress(self.name(), total, total, "Audio mixed");
                Ok(StepOutcome::Success)
            }
            MixOutcome::Unchanged => Ok(StepOutcome::Skipped("nothing to mix".to_string())),
        }
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.mixed.is_none() {
            return Err(StepError::invalid_output("Mixed file not recorded"));
        }
        Ok(())
    }
}
