//! Media engine abstraction and its lifecycle.
//!
//! - [`MediaEngine`]: file primitives plus command execution
//! - [`EngineHandle`]: lazily loads one shared engine, single-flight
//! - [`ToolchainLoader`] / [`ProcessEngine`]: ffmpeg-backed implementation
//!   whose artifacts are fetched from a remote origin or taken from PATH

mod assets;
mod errors;
mod handle;
mod process;
mod types;

pub use assets::{AssetError, AssetFetcher, EngineAssets};
pub use errors::{EngineError, EngineResult, LoadError};
pub use handle::EngineHandle;
pub use process::{ProcessEngine, ToolchainLoader};
pub use types::{
    EngineLoader, EngineState, ExecOutcome, MediaEngine, MediaInfo, StreamInfo, StreamKind,
};
