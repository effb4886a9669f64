//! CLI argument definitions for the Confab application.
//!
//! Uses `clap` with derive macros. Priority resolution: CLI args > env vars
//! > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Confab — a local-first chat client for OpenAI/Ollama-style endpoints.
#[derive(Parser, Debug)]
#[command(name = "confab", version, about)]
pub struct CliArgs {
    /// Path to the settings file holding the current API configuration.
    #[arg(short = 's', long = "settings")]
    pub settings: Option<PathBuf>,

    /// Directory for the conversation database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    pub log_level: String,
}

impl CliArgs {
    /// Resolve the settings file path.
    ///
    /// Priority: --settings flag > CONFAB_SETTINGS env var > data dir
    /// default.
    pub fn resolve_settings_path(&self) -> PathBuf {
        if let Some(ref p) = self.settings {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CONFAB_SETTINGS") {
            return PathBuf::from(p);
        }
        self.resolve_data_dir().join("settings.toml")
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > CONFAB_DATA_DIR env var > ~/.confab.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(ref p) = self.data_dir {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CONFAB_DATA_DIR") {
            return PathBuf::from(p);
        }
        default_data_dir()
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".confab")
}
