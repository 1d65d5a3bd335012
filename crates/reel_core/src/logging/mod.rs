//! Logging for the assembler.
//!
//! - [`init_tracing`] installs the process-wide `tracing` subscriber
//! - [`JobLogger`] is the per-job logger steps write to; it keeps a tail of
//!   engine output and can forward lines to a [`LogSink`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reel_core::logging::{JobLogger, LogConfig, LogSink};
//!
//! let sink: LogSink = Arc::new(|line: &str| eprintln!("{}", line));
//! let logger = JobLogger::new("episode-12", LogConfig::default()).with_sink(Some(sink));
//!
//! logger.stage("Trim");
//! logger.command("ffmpeg -i input_0.mp4 ...");
//! logger.progress(50);
//! logger.success("Episode assembled");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogConfig, LogLevel, LogSink, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `default_level`. Returns false if a subscriber
/// was already installed.
pub fn init_tracing(default_level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok()
}
