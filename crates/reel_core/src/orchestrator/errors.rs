//! Error types for the assembly pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Operation → Detail

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{EngineError, LoadError};
use crate::fetch::FetchError;

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The engine could not be loaded.
    LoadFailure,
    /// A source clip or audio track could not be fetched.
    FetchFailure,
    /// An engine command failed or the engine misbehaved.
    ProcessingError,
    /// An expected workspace file was missing.
    NotFound,
    /// The job itself is malformed.
    InvalidInput,
    Cancelled,
}

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The engine failed to load before any step ran.
    #[error("Job '{job_name}' could not load the media engine: {source}")]
    LoadFailed {
        job_name: String,
        #[source]
        source: LoadError,
    },

    /// A step failed during execution.
    #[error("Job '{job_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Pipeline was cancelled.
    #[error("Job '{job_name}' was cancelled")]
    Cancelled { job_name: String },
}

impl PipelineError {
    pub fn load_failed(job_name: impl Into<String>, source: LoadError) -> Self {
        Self::LoadFailed {
            job_name: job_name.into(),
            source,
        }
    }

    /// Create a step failed error.
    pub fn step_failed(
        job_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_name: job_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(job_name: impl Into<String>) -> Self {
        Self::Cancelled {
            job_name: job_name.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LoadFailed { .. } => ErrorKind::LoadFailure,
            Self::StepFailed { source, .. } => source.kind(),
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Name of the failing step, if a step failed.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step_name, .. } => Some(step_name),
            _ => None,
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// A source could not be fetched.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// An engine command exited non-zero.
    #[error("{operation} failed with exit code {exit_code}: {message}")]
    Processing {
        operation: String,
        exit_code: i32,
        message: String,
    },

    /// A required workspace file was not found.
    #[error("Required file not found: {name}")]
    NotFound { name: String },

    /// An engine primitive failed.
    #[error("Engine error in {operation}: {source}")]
    Engine {
        operation: String,
        #[source]
        source: EngineError,
    },

    /// Generic step error with message.
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn fetch(url: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }

    /// Create a processing error from a failed command.
    pub fn processing(
        operation: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::Processing {
            operation: operation.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Wrap an engine error; a missing file stays `NotFound`.
    pub fn engine(operation: impl Into<String>, source: EngineError) -> Self {
        match source {
            EngineError::NotFound { name } => Self::NotFound { name },
            source => Self::Engine {
                operation: operation.into(),
                source,
            },
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Fetch { .. } => ErrorKind::FetchFailure,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidOutput(_)
            | Self::Processing { .. }
            | Self::Engine { .. }
            | Self::Other(_) => ErrorKind::ProcessingError,
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_displays_context() {
        let err = StepError::processing("trim", 1, "Invalid data found when processing input");
        let msg = err.to_string();
        assert!(msg.contains("trim"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Invalid data"));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::not_found("final.mp4");
        let pipeline_err = PipelineError::step_failed("episode-4", "Finalize", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("episode-4"));
        assert!(msg.contains("Finalize"));
        assert_eq!(pipeline_err.kind(), ErrorKind::NotFound);
        assert_eq!(pipeline_err.step_name(), Some("Finalize"));
    }

    #[test]
    fn engine_not_found_is_preserved() {
        let err = StepError::engine("read", EngineError::not_found("final.mp4"));
        assert!(matches!(err, StepError::NotFound { .. }));

        let err = StepError::engine("exec", EngineError::Terminated);
        assert_eq!(err.kind(), ErrorKind::ProcessingError);
    }

    #[test]
    fn kinds_map_per_layer() {
        let load = PipelineError::load_failed("ep", LoadError::init("no runtime"));
        assert_eq!(load.kind(), ErrorKind::LoadFailure);

        let fetch = StepError::fetch(
            "https://cdn.example.com/s1.mp4",
            FetchError::Status {
                url: "https://cdn.example.com/s1.mp4".to_string(),
                status: 404,
            },
        );
        assert_eq!(fetch.kind(), ErrorKind::FetchFailure);
        assert_eq!(StepError::invalid_input("no clips").kind(), ErrorKind::InvalidInput);
        assert_eq!(PipelineError::cancelled("ep").kind(), ErrorKind::Cancelled);
    }
}
