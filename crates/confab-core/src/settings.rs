//! The global settings slot.
//!
//! Holds the current [`ApiConfig`] that drives new-conversation creation,
//! persisted as a small TOML file. Read once at startup, written on every
//! successful configuration save. Conversations snapshot this configuration
//! at creation time and are never affected by later edits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::types::ApiConfig;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    api: Option<ApiConfig>,
}

/// Process-wide configuration state with an explicit init-on-start and
/// save-on-commit lifecycle. Injected into the orchestrator rather than read
/// through ambient global access.
#[derive(Debug)]
pub struct Settings {
    path: PathBuf,
    current: Option<ApiConfig>,
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: SettingsFile = toml::from_str(&content)?;
        info!("Settings loaded from {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            current: file.api,
        })
    }

    /// Load settings, falling back to an empty slot if the file does not
    /// exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(
                    "Failed to load settings from {}: {}. Starting unconfigured.",
                    path.display(),
                    e
                );
                Self {
                    path: path.to_path_buf(),
                    current: None,
                }
            }
        }
    }

    /// Persist the current state to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = SettingsFile {
            api: self.current.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        std::fs::write(&self.path, content)?;
        info!("Settings saved to {}", self.path.display());
        Ok(())
    }

    /// The current API configuration, if one has been saved.
    pub fn current(&self) -> Option<&ApiConfig> {
        self.current.as_ref()
    }

    /// Replace the current API configuration in memory. Call [`save`] to
    /// commit.
    ///
    /// [`save`]: Settings::save
    pub fn set_current(&mut self, config: ApiConfig) {
        self.current = Some(config);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> ApiConfig {
        ApiConfig {
            host: "localhost:11434".to_string(),
            credential: Some("Bearer tok".to_string()),
            model: "llama3".to_string(),
        }
    }

    #[test]
    fn test_load_missing_file_falls_back_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("settings.toml"));
        assert!(settings.current().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::load_or_default(&path);
        settings.set_current(sample_config());
        settings.save().unwrap();

        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded.current(), Some(&sample_config()));
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::load_or_default(&path);
        settings.set_current(sample_config());
        settings.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_config_without_credential_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::load_or_default(&path);
        settings.set_current(ApiConfig {
            host: "http://x".to_string(),
            credential: None,
            model: "m".to_string(),
        });
        settings.save().unwrap();

        let reloaded = Settings::load(&path).unwrap();
        assert!(reloaded.current().unwrap().credential.is_none());
    }

    #[test]
    fn test_corrupt_file_falls_back_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "api = [[[").unwrap();

        let settings = Settings::load_or_default(&path);
        assert!(settings.current().is_none());
    }
}
