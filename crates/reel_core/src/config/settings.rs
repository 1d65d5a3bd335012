//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Media engine loading and scratch space.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Audio mix output options.
    #[serde(default)]
    pub mixing: MixingSettings,

    /// Source media fetching.
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the engine toolchain comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainSource {
    /// Download the runtime and payload artifacts from `origin`.
    #[default]
    Remote,
    /// Use the executables named by `system_runtime` / `system_payload` from PATH.
    System,
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Toolchain source.
    #[serde(default)]
    pub source: ToolchainSource,

    /// Fixed remote origin both artifacts are fetched from.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Runtime artifact (the ffmpeg executable) under `origin`.
    #[serde(default = "default_runtime_artifact")]
    pub runtime_artifact: String,

    /// Payload artifact (the ffprobe executable) under `origin`.
    #[serde(default = "default_payload_artifact")]
    pub payload_artifact: String,

    /// Runtime executable used when `source = "system"`.
    #[serde(default = "default_system_runtime")]
    pub system_runtime: String,

    /// Payload executable used when `source = "system"`.
    #[serde(default = "default_system_payload")]
    pub system_payload: String,

    /// Directory for cached artifacts. Empty = platform cache dir.
    #[serde(default)]
    pub cache_dir: String,

    /// Root under which each engine creates its scratch directory. Empty = system temp.
    #[serde(default)]
    pub scratch_root: String,
}

fn default_origin() -> String {
    "https://github.com/eugeneware/ffmpeg-static/releases/download/b6.0".to_string()
}

fn default_runtime_artifact() -> String {
    format!("ffmpeg-{}", platform_suffix())
}

fn default_payload_artifact() -> String {
    format!("ffprobe-{}", platform_suffix())
}

fn default_system_runtime() -> String {
    "ffmpeg".to_string()
}

fn default_system_payload() -> String {
    "ffprobe".to_string()
}

/// Platform suffix used by the static toolchain release assets.
fn platform_suffix() -> &'static str {
    if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
        "linux-arm64"
    } else if cfg!(target_os = "linux") {
        "linux-x64"
    } else if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
        "darwin-arm64"
    } else if cfg!(target_os = "macos") {
        "darwin-x64"
    } else {
        "win32-x64"
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            source: ToolchainSource::default(),
            origin: default_origin(),
            runtime_artifact: default_runtime_artifact(),
            payload_artifact: default_payload_artifact(),
            system_runtime: default_system_runtime(),
            system_payload: default_system_payload(),
            cache_dir: String::new(),
            scratch_root: String::new(),
        }
    }
}

impl EngineSettings {
    /// Settings that use the toolchain installed on PATH.
    pub fn system() -> Self {
        Self {
            source: ToolchainSource::System,
            ..Self::default()
        }
    }

    /// Full URL of the runtime artifact.
    pub fn runtime_url(&self) -> String {
        join_url(&self.origin, &self.runtime_artifact)
    }

    /// Full URL of the payload artifact.
    pub fn payload_url(&self) -> String {
        join_url(&self.origin, &self.payload_artifact)
    }

    /// Resolved artifact cache directory.
    pub fn cache_path(&self) -> PathBuf {
        if !self.cache_dir.is_empty() {
            return PathBuf::from(&self.cache_dir);
        }
        directories::ProjectDirs::from("", "", "reel-assembler")
            .map(|dirs| dirs.cache_dir().join("engine"))
            .unwrap_or_else(|| std::env::temp_dir().join("reel-assembler-cache"))
    }

    /// Resolved scratch root.
    pub fn scratch_path(&self) -> PathBuf {
        if self.scratch_root.is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&self.scratch_root)
        }
    }
}

fn join_url(origin: &str, artifact: &str) -> String {
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        artifact.trim_start_matches('/')
    )
}

/// Audio mix output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixingSettings {
    /// Codec for the re-encoded audio stream.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Bitrate for the re-encoded audio stream.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Extension for staged audio when the URL has none.
    #[serde(default = "default_audio_extension")]
    pub fallback_extension: String,
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

fn default_audio_extension() -> String {
    ".mp3".to_string()
}

impl Default for MixingSettings {
    fn default() -> Self {
        Self {
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            fallback_extension: default_audio_extension(),
        }
    }
}

/// Source fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// User agent sent with source and asset requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP connect timeout in seconds (0 = none).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Allow `file://` URLs and bare local paths.
    #[serde(default = "default_true")]
    pub allow_local: bool,
}

fn default_user_agent() -> String {
    format!("reel-assembler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            allow_local: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for per-job logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format (engine output only kept in the tail buffer).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of engine output lines kept for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Log every engine command line.
    #[serde(default = "default_true")]
    pub show_commands: bool,
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_commands: true,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Engine,
    Mixing,
    Fetch,
    Logging,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Engine,
        ConfigSection::Mixing,
        ConfigSection::Fetch,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Engine => "engine",
            ConfigSection::Mixing => "mixing",
            ConfigSection::Fetch => "fetch",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Engine => "Media engine toolchain and scratch space",
            ConfigSection::Mixing => "Audio mix output",
            ConfigSection::Fetch => "Source media fetching",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}
