//! Data models for the assembler.
//!
//! All models are ephemeral: their lifetime is bounded by one pipeline run.
//! - Clip and audio track specifications
//! - Assembly jobs and the produced media blob

mod clip;
mod job;

pub use clip::{AudioTrackSpec, ClipSpec};
pub use job::{AssemblyJob, MediaBlob, VIDEO_MP4};
