//! Pipeline runner that executes steps in sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{PipelineError, PipelineResult};
use super::step::PipelineStep;
use super::types::{Context, JobState, StepOutcome};
use crate::workspace::CleanupReport;

/// Pipeline that runs a sequence of steps.
///
/// Steps run in order with validation before and after each one. Whatever
/// happens, every workspace name recorded in `state.scratch` is deleted
/// before `run` returns.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Get a cancellation handle.
    ///
    /// Call `cancel()` on the returned handle to stop the pipeline
    /// at the next step boundary. A running engine command is not
    /// interrupted.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Check if pipeline has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run all steps, then clean up the workspace.
    ///
    /// Progress stays below 100; the caller completes it once it holds the
    /// output. A cleanup failure never replaces the run's own result.
    pub async fn run(
        &self,
        ctx: &Context,
        state: &mut JobState,
    ) -> PipelineResult<PipelineRunResult> {
        let outcome = self.run_steps(ctx, state).await;

        let cleanup = ctx.workspace.cleanup(&state.scratch).await;
        log_cleanup(ctx, &cleanup);
        state.scratch = Default::default();

        match outcome {
            Ok(mut result) => {
                result.cleanup = cleanup;
                ctx.logger.success("Pipeline completed successfully");
                Ok(result)
            }
            Err(e) => {
                ctx.logger.error(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        ctx: &Context,
        state: &mut JobState,
    ) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();

        for step in &self.steps {
            let step_name = step.name();

            if self.is_cancelled() {
                ctx.logger
                    .warn(&format!("Pipeline cancelled before step '{}'", step_name));
                return Err(PipelineError::cancelled(&ctx.job_name));
            }

            ctx.logger.stage(step_name);
            let (start, end) = step.progress_span();
            ctx.progress.enter(step_name, start, end);

            ctx.logger
                .debug(&format!("Validating input for '{}'", step_name));
            step.validate_input(ctx, state)
                .map_err(|e| PipelineError::step_failed(&ctx.job_name, step_name, e))?;

            ctx.logger.debug(&format!("Executing '{}'", step_name));
            let outcome = step
                .execute(ctx, state)
                .await
                .map_err(|e| PipelineError::step_failed(&ctx.job_name, step_name, e))?;

            match outcome {
                StepOutcome::Success => {
                    step.validate_output(ctx, state).map_err(|e| {
                        PipelineError::step_failed(&ctx.job_name, step_name, e)
                    })?;
                    ctx.logger.success(&format!("{} completed", step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                StepOutcome::Skipped(reason) => {
                    ctx.logger
                        .info(&format!("{} skipped: {}", step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
            }
        }

        Ok(result)
    }

    /// Get the number of steps in the pipeline.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn log_cleanup(ctx: &Context, report: &CleanupReport) {
    if report.is_clean() {
        ctx.logger.debug(&format!(
            "Cleaned up {} workspace file(s)",
            report.deleted
        ));
    } else {
        for (name, reason) in &report.failed {
            ctx.logger
                .warn(&format!("Could not delete {}: {}", name, reason));
        }
    }
}

/// Handle for cancelling a running pipeline.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the pipeline at the next step boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    /// Steps that completed successfully.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
    /// What the final cleanup did.
    pub cleanup: CleanupReport,
}

impl PipelineRunResult {
    /// Check if all steps completed (none skipped).
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }

    /// Total number of steps that ran.
    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}
