//! Job-scoped view of the engine's file namespace.
//!
//! Every name a job creates is prefixed with a job token so jobs sharing
//! one engine never collide, and recorded in a [`ScratchSet`] so
//! [`Workspace::cleanup`] can remove it whatever the outcome.

mod scratch;

use std::sync::Arc;

use crate::command::EngineCommand;
use crate::engine::{EngineError, EngineResult, ExecOutcome, MediaEngine, MediaInfo};

pub use scratch::ScratchSet;

/// Check that a workspace name is a flat file name.
pub fn validate_name(name: &str) -> EngineResult<()> {
    if name.trim().is_empty() {
        return Err(EngineError::invalid_name(name, "name is empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(EngineError::invalid_name(name, "name contains a path separator"));
    }
    if name.contains("..") {
        return Err(EngineError::invalid_name(name, "name contains '..'"));
    }
    Ok(())
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    /// Names that were already gone.
    pub missing: usize,
    /// Names that could not be deleted, with the reason.
    pub failed: Vec<(String, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// File operations against a ready engine.
#[derive(Clone)]
pub struct Workspace {
    engine: Arc<dyn MediaEngine>,
    prefix: String,
}

impl Workspace {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            prefix: String::new(),
        }
    }

    /// Workspace whose generated names start with `prefix`.
    pub fn scoped(engine: Arc<dyn MediaEngine>, prefix: impl Into<String>) -> Self {
        Self {
            engine,
            prefix: prefix.into(),
        }
    }

    /// Job-scoped name for `base` (e.g. `input_0.mp4`).
    pub fn name(&self, base: &str) -> String {
        format!("{}{}", self.prefix, base)
    }

    pub fn engine(&self) -> &Arc<dyn MediaEngine> {
        &self.engine
    }

    pub async fn write(&self, name: &str, bytes: &[u8]) -> EngineResult<()> {
        validate_name(name)?;
        tracing::trace!("workspace write {} ({} bytes)", name, bytes.len());
        self.engine.write_file(name, bytes).await
    }

    /// Read a file; `NotFound` if it does not exist.
    pub async fn read(&self, name: &str) -> EngineResult<Vec<u8>> {
        validate_name(name)?;
        self.engine.read_file(name).await
    }

    pub async fn delete(&self, name: &str) -> EngineResult<()> {
        validate_name(name)?;
        self.engine.delete_file(name).await
    }

    pub async fn probe(&self, name: &str) -> EngineResult<MediaInfo> {
        validate_name(name)?;
        self.engine.probe(name).await
    }

    pub async fn exec(&self, command: &EngineCommand) -> EngineResult<ExecOutcome> {
        self.engine.exec(&command.to_args()).await
    }

    /// Delete every tracked name.
    ///
    /// Never fails: absent names are ignored and other failures are logged.
    pub async fn cleanup(&self, scratch: &ScratchSet) -> CleanupReport {
        let mut report = CleanupReport::default();

        for name in scratch.iter() {
            match self.engine.delete_file(name).await {
                Ok(()) => report.deleted += 1,
                Err(e) if e.is_not_found() => {
                    tracing::trace!("cleanup: {} already gone", name);
                    report.missing += 1;
                }
                Err(e) => {
                    tracing::warn!("cleanup: failed to delete {}: {}", name, e);
                    report.failed.push((name.to_string(), e.to_string()));
                }
            }
        }

        tracing::debug!(
            "cleanup removed {} file(s), {} already gone, {} failed",
            report.deleted,
            report.missing,
            report.failed.len()
        );
        report
    }
}
