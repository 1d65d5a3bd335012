//! Core types for the assembly pipeline.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Settings;
use crate::fetch::SourceFetcher;
use crate::logging::JobLogger;
use crate::models::{AssemblyJob, MediaBlob};
use crate::workspace::{ScratchSet, Workspace};

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Outcome of a step's `execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Nothing to do; the reason is logged.
    Skipped(String),
}

/// Turns per-step progress into one non-decreasing 0..=100 sequence.
///
/// Each step owns a span of the range. Reports never go backwards and
/// stay below 100 until [`ProgressTracker::complete`] is called.
pub struct ProgressTracker {
    callback: Option<ProgressCallback>,
    inner: Mutex<ProgressState>,
}

#[derive(Default)]
struct ProgressState {
    last: Option<u32>,
    span: (u32, u32),
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            inner: Mutex::new(ProgressState::default()),
        }
    }

    /// Start a step spanning `start..end` percent.
    pub fn enter(&self, step: &str, start: u32, end: u32) {
        {
            let mut state = self.inner.lock();
            let start = start.min(99);
            state.span = (start, end.clamp(start, 99));
        }
        self.report(step, start, &format!("Starting {}", step));
    }

    /// Report `done` of `total` items finished within the current span.
    pub fn advance(&self, step: &str, done: usize, total: usize, message: &str) {
        let (start, end) = self.inner.lock().span;
        let fraction = if total == 0 {
            1.0
        } else {
            (done.min(total) as f64) / (total as f64)
        };
        let percent = start + ((end - start) as f64 * fraction).round() as u32;
        self.report(step, percent, message);
    }

    /// Report an absolute percentage, clamped below 100.
    pub fn report(&self, step: &str, percent: u32, message: &str) {
        self.emit(step, percent.min(99), message);
    }

    /// Report 100; only a successful run calls this.
    pub fn complete(&self, message: &str) {
        self.emit("Complete", 100, message);
    }

    /// Last value handed to the callback.
    pub fn last(&self) -> Option<u32> {
        self.inner.lock().last
    }

    fn emit(&self, step: &str, percent: u32, message: &str) {
        {
            let mut state = self.inner.lock();
            if let Some(last) = state.last {
                if percent <= last {
                    return;
                }
            }
            state.last = Some(percent);
        }

        if let Some(ref callback) = self.callback {
            callback(step, percent, message);
        }
    }
}

/// Read-only context passed to pipeline steps.
///
/// Mutable state goes in `JobState`.
pub struct Context {
    pub job: AssemblyJob,
    pub settings: Settings,
    /// Job name used in logs and errors.
    pub job_name: String,
    /// Job-scoped view of the engine workspace.
    pub workspace: Workspace,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub logger: Arc<JobLogger>,
    pub progress: ProgressTracker,
}

impl Context {
    pub fn new(
        job: AssemblyJob,
        settings: Settings,
        workspace: Workspace,
        fetcher: Arc<dyn SourceFetcher>,
        logger: Arc<JobLogger>,
    ) -> Self {
        Self {
            job_name: job.name.clone(),
            job,
            settings,
            workspace,
            fetcher,
            logger,
            progress: ProgressTracker::new(None),
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress = ProgressTracker::new(callback);
        self
    }

    /// Log progress and forward it to the callback.
    pub fn report_progress(&self, step_name: &str, done: usize, total: usize, message: &str) {
        self.progress.advance(step_name, done, total, message);
        if let Some(percent) = self.progress.last() {
            self.logger.progress(percent);
        }
    }
}

/// Mutable job state that accumulates results from pipeline steps.
#[derive(Debug, Default)]
pub struct JobState {
    pub job_id: String,
    /// When the job started.
    pub started_at: Option<String>,
    /// Every workspace name this job created; emptied by cleanup.
    pub scratch: ScratchSet,
    /// Staged source clips, in clip order.
    pub staged: Vec<String>,
    /// Trimmed clips, in clip order.
    pub trimmed: Vec<String>,
    /// Concatenated video.
    pub merged: Option<String>,
    /// Video with overlay audio mixed in.
    pub mixed: Option<String>,
    /// Final artifact, read back from the workspace.
    pub output: Option<MediaBlob>,
}

impl JobState {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Workspace name of the file that becomes the output.
    ///
    /// Mixed wins over merged; a lone trimmed clip stands on its own.
    pub fn final_name(&self) -> Option<&str> {
        if let Some(mixed) = self.mixed.as_deref() {
            return Some(mixed);
        }
        if let Some(merged) = self.merged.as_deref() {
            return Some(merged);
        }
        match self.trimmed.as_slice() {
            [single] => Some(single.as_str()),
            _ => None,
        }
    }

    /// Record a name before anything tries to create it.
    pub fn track(&mut self, name: &str) {
        self.scratch.insert(name);
    }
}
