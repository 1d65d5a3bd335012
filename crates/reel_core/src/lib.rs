//! Reel Core - episode assembly pipeline
//!
//! This crate trims, concatenates and audio-mixes video clips through a
//! single shared media engine. It has zero UI dependencies and is consumed
//! in-process by the surrounding application.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reel_core::config::Settings;
//! use reel_core::engine::{EngineHandle, ToolchainLoader};
//! use reel_core::fetch::HttpFetcher;
//! use reel_core::models::{AssemblyJob, ClipSpec};
//! use reel_core::orchestrator::Assembler;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let handle = EngineHandle::new(Arc::new(ToolchainLoader::new(settings.engine.clone())));
//! let fetcher = Arc::new(HttpFetcher::new(&settings.fetch)?);
//! let assembler = Assembler::new(handle, fetcher, settings);
//!
//! let job = AssemblyJob::new("episode-1")
//!     .with_clip(ClipSpec::new("https://cdn.example.com/scene1.mp4", 0.0, 4.5))
//!     .with_clip(ClipSpec::new("https://cdn.example.com/scene2.mp4", 1.0, 6.0));
//!
//! let blob = assembler.trim_and_merge(job, None).await?;
//! assert_eq!(blob.mime, "video/mp4");
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod engine;
pub mod fetch;
pub mod logging;
pub mod models;
pub mod ops;
pub mod orchestrator;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
