//! Settings file handling.
//!
//! The file is always replaced through a sibling temp file, and single
//! sections can be rewritten with `toml_edit` so hand-written comments in
//! the other tables survive.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings, ToolchainSource};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config cannot be edited: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid [{section}] setting: {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the assembler settings and the TOML file they live in.
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Manager for `path`; settings start at their defaults until loaded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Settings::default(),
        }
    }

    /// `settings.toml` in the per-user config directory.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "reel-assembler")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("reel-assembler.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory settings; persist with `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read and validate an existing file.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound(self.path.clone()));
        }
        let text = fs::read_to_string(&self.path)?;
        let settings: Settings = toml::from_str(&text)?;
        validate(&settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Read the file, or write one with defaults when it is missing.
    ///
    /// Tables the assembler does not know are dropped by rewriting the file.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.path.exists() {
            self.settings = Settings::default();
            tracing::info!("Creating default config at {}", self.path.display());
            return self.save();
        }

        let text = fs::read_to_string(&self.path)?;
        let settings: Settings = toml::from_str(&text)?;
        validate(&settings)?;
        self.settings = settings;

        let stray = unknown_tables(&text)?;
        if !stray.is_empty() {
            tracing::info!(
                "Dropping unknown config table(s) {} from {}",
                stray.join(", "),
                self.path.display()
            );
            self.save()?;
        }
        Ok(())
    }

    /// Rewrite the whole file from the current settings.
    pub fn save(&self) -> ConfigResult<()> {
        validate(&self.settings)?;
        let mut text = String::from("# reel-assembler settings\n\n");
        for section in ConfigSection::ALL {
            text.push_str(&format!("# {}\n[{}]\n", section.description(), section.table_name()));
            text.push_str(&self.render(section)?);
            text.push('\n');
        }
        self.replace_file(&text)?;
        Ok(())
    }

    /// Rewrite one table, keeping the rest of the file as it is on disk.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        validate(&self.settings)?;
        let mut doc = match fs::read_to_string(&self.path) {
            Ok(text) => text.parse::<DocumentMut>()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DocumentMut::new(),
            Err(e) => return Err(e.into()),
        };

        let table: DocumentMut = self.render(section)?.parse()?;
        doc[section.table_name()] = Item::Table(table.as_table().clone());

        self.replace_file(&doc.to_string())?;
        Ok(())
    }

    fn render(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        Ok(match section {
            ConfigSection::Engine => toml::to_string_pretty(&s.engine)?,
            ConfigSection::Mixing => toml::to_string_pretty(&s.mixing)?,
            ConfigSection::Fetch => toml::to_string_pretty(&s.fetch)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
        })
    }

    fn replace_file(&self, text: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
        staged.write_all(text.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn unknown_tables(text: &str) -> ConfigResult<Vec<String>> {
    let doc: DocumentMut = text.parse()?;
    Ok(doc
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !ConfigSection::ALL.iter().any(|s| s.table_name() == *key))
        .map(str::to_string)
        .collect())
}

/// Reject settings the engine or mixer could not work with.
fn validate(settings: &Settings) -> ConfigResult<()> {
    let engine = &settings.engine;
    if engine.source == ToolchainSource::Remote
        && !(engine.origin.starts_with("http://") || engine.origin.starts_with("https://"))
    {
        return Err(ConfigError::Invalid {
            section: "engine",
            message: format!("origin must be an http(s) URL, got '{}'", engine.origin),
        });
    }
    if engine.source == ToolchainSource::System && engine.system_runtime.trim().is_empty() {
        return Err(ConfigError::Invalid {
            section: "engine",
            message: "system_runtime is empty".to_string(),
        });
    }

    let mixing = &settings.mixing;
    if mixing.audio_codec.trim().is_empty() {
        return Err(ConfigError::Invalid {
            section: "mixing",
            message: "audio_codec is empty".to_string(),
        });
    }
    if !mixing.fallback_extension.starts_with('.') {
        return Err(ConfigError::Invalid {
            section: "mixing",
            message: format!(
                "fallback_extension must start with '.', got '{}'",
                mixing.fallback_extension
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_every_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        for section in ConfigSection::ALL {
            assert!(text.contains(&format!("[{}]", section.table_name())));
        }
    }

    #[test]
    fn saved_values_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&path);
        manager.settings_mut().mixing.audio_bitrate = "96k".to_string();
        manager.save().unwrap();

        let mut reloaded = ConfigManager::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().mixing.audio_bitrate, "96k");
    }

    #[test]
    fn partial_file_keeps_its_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[engine]\nsource = \"system\"\n").unwrap();

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().engine.source, ToolchainSource::System);
        assert_eq!(manager.settings().mixing.audio_codec, "aac");
    }

    #[test]
    fn unknown_tables_are_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[legacy]\nfoo = 1\n\n[mixing]\naudio_codec = \"opus\"\n").unwrap();

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("[legacy]"));
        assert!(text.contains("audio_codec = \"opus\""));
    }

    #[test]
    fn section_update_keeps_comments_elsewhere() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "# pinned build\n[engine]\nsource = \"system\"\n\n[logging]\ncompact = true\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&path);
        manager.load().unwrap();
        manager.settings_mut().logging.compact = false;
        manager.update_section(ConfigSection::Logging).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("# pinned build"));
        assert!(text.contains("compact = false"));
    }

    #[test]
    fn load_of_absent_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn non_http_origin_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[engine]\norigin = \"ftp://mirror\"\n").unwrap();

        let mut manager = ConfigManager::new(&path);
        let err = manager.load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { section: "engine", .. }));
    }

    #[test]
    fn bad_fallback_extension_blocks_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&path);
        manager.settings_mut().mixing.fallback_extension = "mp3".to_string();
        assert!(manager.save().is_err());
        assert!(!path.exists());
    }
}
