//! Per-job logger.
//!
//! Every line becomes a `tracing` event carrying the job name and, when a
//! [`LogSink`] is attached, a formatted line for the caller. The last
//! engine output lines are kept so a failed command can be explained.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, LogSink, MessagePrefix};

pub struct JobLogger {
    job_name: String,
    config: LogConfig,
    sink: Option<LogSink>,
    tail: Mutex<VecDeque<String>>,
    last_progress: Mutex<Option<u32>>,
}

impl JobLogger {
    pub fn new(job_name: impl Into<String>, config: LogConfig) -> Self {
        let capacity = config.error_tail;
        Self {
            job_name: job_name.into(),
            config,
            sink: None,
            tail: Mutex::new(VecDeque::with_capacity(capacity)),
            last_progress: Mutex::new(None),
        }
    }

    /// Forward formatted lines to `sink` as well as to `tracing`.
    pub fn with_sink(mut self, sink: Option<LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Default configuration, no sink.
    pub fn detached(job_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(job_name, LogConfig::default()))
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let job = self.job_name.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(job, "{}", message),
            LogLevel::Debug => tracing::debug!(job, "{}", message),
            LogLevel::Info => tracing::info!(job, "{}", message),
            LogLevel::Warn => tracing::warn!(job, "{}", message),
            LogLevel::Error => tracing::error!(job, "{}", message),
        }

        if let Some(sink) = &self.sink {
            if self.config.show_timestamps {
                sink(&format!("[{}] {}", Local::now().format("%H:%M:%S"), message));
            } else {
                sink(message);
            }
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Engine command about to run; silent unless `show_commands`.
    pub fn command(&self, command: &str) {
        if self.config.show_commands {
            self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
        }
    }

    pub fn stage(&self, stage_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Stage.format(stage_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log overall progress.
    ///
    /// In compact mode only the first report, each crossing of a
    /// `progress_step` boundary and 100 get through. Returns whether the
    /// value was logged.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step;
            let crossed = match *last {
                None => true,
                Some(prev) => percent / step > prev / step || (percent >= 100 && prev < 100),
            };
            if !crossed {
                return false;
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Record one line of engine output in the tail buffer.
    ///
    /// Outside compact mode the line is also logged at debug.
    pub fn engine_line(&self, line: &str) {
        {
            let mut tail = self.tail.lock();
            if tail.len() >= self.config.error_tail {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }

        if !self.config.compact {
            self.log(LogLevel::Debug, &MessagePrefix::Engine.format(line));
        }
    }

    /// Log the buffered engine output under `header`.
    pub fn show_tail(&self, header: &str) {
        let lines = self.get_tail();
        if lines.is_empty() {
            return;
        }

        self.log(LogLevel::Error, &format!("[{}/tail]", header));
        for line in &lines {
            self.log(LogLevel::Error, line);
        }
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail.lock().iter().cloned().collect()
    }
}
