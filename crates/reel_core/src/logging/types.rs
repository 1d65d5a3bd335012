//! Log levels, per-job log configuration and line formatting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Per-job logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Engine output only goes to the tail buffer.
    pub compact: bool,
    /// Progress is logged only when it crosses a multiple of this.
    pub progress_step: u32,
    /// Engine lines kept for failure reports.
    pub error_tail: usize,
    /// Prefix sink lines with the wall-clock time.
    pub show_timestamps: bool,
    /// Log each engine command line before it runs.
    pub show_commands: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::from(&LoggingSettings::default())
    }
}

impl From<&LoggingSettings> for LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            compact: settings.compact,
            progress_step: settings.progress_step.max(1),
            error_tail: (settings.error_tail as usize).max(1),
            show_timestamps: true,
            show_commands: settings.show_commands,
        }
    }
}

/// Receives every formatted line of a job's log, e.g. a status panel.
///
/// Shared so one sink can follow every job an assembler runs.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Marker put in front of a line so its kind is visible in plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// `$ ffmpeg ...`
    Command,
    /// `=== Trim ===`
    Stage,
    /// `[engine] ...`
    Engine,
    Success,
    Warning,
    Error,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        match self {
            MessagePrefix::Command => format!("$ {}", message),
            MessagePrefix::Stage => format!("=== {} ===", message),
            MessagePrefix::Engine => format!("[engine] {}", message),
            MessagePrefix::Success => format!("[SUCCESS] {}", message),
            MessagePrefix::Warning => format!("[WARNING] {}", message),
            MessagePrefix::Error => format!("[ERROR] {}", message),
        }
    }
}
