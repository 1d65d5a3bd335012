//! Engine traits and the values they exchange.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{EngineError, EngineResult, LoadError};

/// Lifecycle state reported by [`super::EngineHandle::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
}

/// Result of one engine command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    /// Process-style exit code; 0 means success.
    pub exit_code: i32,
    /// Last lines the engine logged while running the command.
    pub log_tail: Vec<String>,
}

impl ExecOutcome {
    pub fn new(exit_code: i32, log_tail: Vec<String>) -> Self {
        Self {
            exit_code,
            log_tail,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Log tail joined into one message.
    pub fn tail_message(&self) -> String {
        self.log_tail.join("\n")
    }
}

/// Kind of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Other,
}

impl StreamKind {
    fn from_codec_type(value: &str) -> Self {
        match value {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "subtitle" => Self::Subtitle,
            "data" => Self::Data,
            _ => Self::Other,
        }
    }
}

/// One stream reported by a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: u32,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
}

/// Container facts reported by [`MediaEngine::probe`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds, when known.
    pub duration_secs: Option<f64>,
    pub format_name: Option<String>,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.streams.iter().any(|s| s.kind == StreamKind::Audio)
    }

    pub fn has_video(&self) -> bool {
        self.streams.iter().any(|s| s.kind == StreamKind::Video)
    }

    /// Parse `ffprobe -print_format json -show_format -show_streams` output.
    pub fn from_ffprobe_json(bytes: &[u8]) -> EngineResult<Self> {
        let json: Value = serde_json::from_slice(bytes)
            .map_err(|e| EngineError::parse("probe output", e.to_string()))?;

        let format = json.get("format");

        // ffprobe reports numbers as strings
        let duration_secs = format
            .and_then(|f| f.get("duration"))
            .and_then(|d| d.as_str())
            .and_then(|d| d.parse::<f64>().ok());

        let format_name = format
            .and_then(|f| f.get("format_name"))
            .and_then(|n| n.as_str())
            .map(|s| s.to_string());

        let streams = json
            .get("streams")
            .and_then(|s| s.as_array())
            .map(|streams| streams.iter().filter_map(parse_stream).collect())
            .unwrap_or_default();

        Ok(Self {
            duration_secs,
            format_name,
            streams,
        })
    }
}

fn parse_stream(stream: &Value) -> Option<StreamInfo> {
    let index = stream.get("index")?.as_u64()? as u32;
    let kind = stream
        .get("codec_type")
        .and_then(|t| t.as_str())
        .map(StreamKind::from_codec_type)
        .unwrap_or(StreamKind::Other);
    let codec_name = stream
        .get("codec_name")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string());

    Some(StreamInfo {
        index,
        kind,
        codec_name,
    })
}

/// A loaded media engine with a private, flat file namespace.
///
/// Implementations run one primitive at a time; callers may share one
/// instance across jobs.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Create or replace a workspace file.
    async fn write_file(&self, name: &str, data: &[u8]) -> EngineResult<()>;

    /// Read a workspace file; `NotFound` if absent.
    async fn read_file(&self, name: &str) -> EngineResult<Vec<u8>>;

    /// Delete a workspace file; `NotFound` if absent.
    async fn delete_file(&self, name: &str) -> EngineResult<()>;

    /// Run one command (arguments only, no program name).
    ///
    /// A non-zero exit is reported in the outcome, not as an error.
    async fn exec(&self, args: &[String]) -> EngineResult<ExecOutcome>;

    /// Inspect a workspace file.
    async fn probe(&self, name: &str) -> EngineResult<MediaInfo> {
        Err(EngineError::Unsupported(format!("probe of {}", name)))
    }

    /// Release the engine and everything in its workspace.
    async fn terminate(&self) -> EngineResult<()>;
}

/// Produces a ready engine. Called at most once per load attempt.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn MediaEngine>, LoadError>;
}
