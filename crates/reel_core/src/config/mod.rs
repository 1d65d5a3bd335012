//! Configuration management for the assembler.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//!
//! # Example
//!
//! ```no_run
//! use reel_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/reel.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Audio codec: {}", config.settings().mixing.audio_codec);
//!
//! config.settings_mut().mixing.audio_bitrate = "192k".to_string();
//! config.update_section(ConfigSection::Mixing).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, EngineSettings, FetchSettings, LoggingSettings, MixingSettings, Settings,
    ToolchainSource,
};
