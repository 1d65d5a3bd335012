//! Error types for engine loading and engine primitives.

use std::io;

use thiserror::Error;

/// Error from an engine primitive (write, read, delete, exec, probe).
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine was terminated; acquire a fresh one from the handle.
    #[error("Engine has been terminated")]
    Terminated,

    /// A workspace name does not exist.
    #[error("Workspace file not found: {name}")]
    NotFound { name: String },

    /// A workspace name is not a flat file name.
    #[error("Invalid workspace file name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The engine executable could not be started.
    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// File I/O inside the engine workspace failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Engine output could not be parsed.
    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    /// The engine does not implement this primitive.
    #[error("Operation not supported by this engine: {0}")]
    Unsupported(String),
}

impl EngineError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a parse error.
    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the name is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for engine primitives.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal error while loading the engine.
///
/// Cloneable so every caller waiting on one in-flight load receives it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The runtime artifact could not be fetched.
    #[error("Failed to fetch engine runtime from {url}: {message}")]
    RuntimeFetch { url: String, message: String },

    /// The compute payload artifact could not be fetched.
    #[error("Failed to fetch engine payload from {url}: {message}")]
    PayloadFetch { url: String, message: String },

    /// The artifacts were fetched but the engine did not start.
    #[error("Engine initialization failed: {0}")]
    Init(String),

    /// The handle was released before the load finished; the engine that
    /// loaded has already been terminated.
    #[error("Engine was released while loading")]
    Released,
}

impl LoadError {
    /// Create an initialization error.
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_name_the_artifact() {
        let runtime = LoadError::RuntimeFetch {
            url: "https://assets.example.com/ffmpeg".to_string(),
            message: "HTTP 404".to_string(),
        };
        let payload = LoadError::PayloadFetch {
            url: "https://assets.example.com/ffprobe".to_string(),
            message: "HTTP 503".to_string(),
        };

        assert!(runtime.to_string().contains("runtime"));
        assert!(payload.to_string().contains("payload"));
        assert_ne!(runtime, payload);
    }

    #[test]
    fn not_found_is_detected() {
        assert!(EngineError::not_found("final.mp4").is_not_found());
        assert!(!EngineError::Terminated.is_not_found());
    }
}
