//! Entry point that turns assembly requests into pipeline runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Settings;
use crate::engine::EngineHandle;
use crate::fetch::SourceFetcher;
use crate::logging::{JobLogger, LogConfig, LogSink};
use crate::models::{AssemblyJob, ClipSpec, MediaBlob};
use crate::workspace::Workspace;

use super::errors::{PipelineError, PipelineResult, StepError};
use super::pipeline::Pipeline;
use super::types::{Context, JobState, ProgressCallback};
use super::{create_assembly_pipeline, create_merge_pipeline, create_trim_pipeline};

static JOB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Workspace prefix unique to one run in this process.
fn next_job_prefix() -> String {
    format!("j{}_", JOB_COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
}

/// Assembles episodes on a shared engine.
///
/// Cheap to share behind an `Arc`; concurrent jobs are safe because each
/// gets its own workspace prefix, though the engine runs their commands
/// one at a time.
pub struct Assembler {
    handle: EngineHandle,
    fetcher: Arc<dyn SourceFetcher>,
    settings: Settings,
    log_sink: Option<LogSink>,
}

impl Assembler {
    pub fn new(handle: EngineHandle, fetcher: Arc<dyn SourceFetcher>, settings: Settings) -> Self {
        Self {
            handle,
            fetcher,
            settings,
            log_sink: None,
        }
    }

    /// Send every job's log lines to `sink`.
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.handle
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Trim every clip, join them in order, mix any audio tracks and
    /// return the finished MP4.
    pub async fn trim_and_merge(
        &self,
        job: AssemblyJob,
        progress: Option<ProgressCallback>,
    ) -> PipelineResult<MediaBlob> {
        self.run(create_assembly_pipeline(), job, progress).await
    }

    /// Cut one window out of one source.
    pub async fn trim_video(
        &self,
        url: &str,
        start: f64,
        end: f64,
        progress: Option<ProgressCallback>,
    ) -> PipelineResult<MediaBlob> {
        let job = AssemblyJob::new("trim").with_clip(ClipSpec::new(url, start, end));
        self.run(create_trim_pipeline(), job, progress).await
    }

    /// Join whole sources in order, without trimming.
    pub async fn merge_videos(
        &self,
        urls: &[String],
        progress: Option<ProgressCallback>,
    ) -> PipelineResult<MediaBlob> {
        let job = AssemblyJob::new("merge")
            .with_clips(urls.iter().map(|url| ClipSpec::new(url.as_str(), 0.0, 0.0)));
        self.run(create_merge_pipeline(), job, progress).await
    }

    /// Run `job` through a caller-built pipeline.
    ///
    /// Take a [`super::CancelHandle`] from `pipeline` first to stop it
    /// between steps. The run lives on its own task: dropping the returned
    /// future stops the wait, not the work or the cleanup after it.
    pub async fn run(
        &self,
        pipeline: Pipeline,
        job: AssemblyJob,
        progress: Option<ProgressCallback>,
    ) -> PipelineResult<MediaBlob> {
        let job_name = job.name.clone();

        let engine = self
            .handle
            .acquire()
            .await
            .map_err(|e| PipelineError::load_failed(&job_name, e))?;

        let logger = Arc::new(
            JobLogger::new(&job_name, LogConfig::from(&self.settings.logging))
                .with_sink(self.log_sink.clone()),
        );
        let workspace = Workspace::scoped(engine, next_job_prefix());
        let ctx = Context::new(
            job,
            self.settings.clone(),
            workspace,
            Arc::clone(&self.fetcher),
            logger,
        )
        .with_progress_callback(progress);

        match tokio::spawn(run_job(pipeline, ctx)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(PipelineError::cancelled(&job_name)),
        }
    }
}

/// Run the pipeline and complete progress once the output is in hand.
async fn run_job(pipeline: Pipeline, ctx: Context) -> PipelineResult<MediaBlob> {
    let mut state = JobState::new(&ctx.job_name);
    pipeline.run(&ctx, &mut state).await?;

    let output = state.output.take().ok_or_else(|| {
        PipelineError::step_failed(
            &ctx.job_name,
            "Finalize",
            StepError::invalid_output("pipeline produced no output"),
        )
    })?;

    ctx.progress.complete("Assembly finished");
    ctx.logger.progress(100);
    Ok(output)
}
