//! Configuration for the toolkit context and binary
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/toolkit/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod debug;
mod observability;
mod serialization;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use debug::{DebugMode, FileDebug};
pub use observability::{LogRotation, LoggingConfig, TRACE_TARGET};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Env var for the process-wide debug switch
pub const DEBUG_ENV: &str = "TOOLKIT_DEBUG";

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// User-facing strings widgets may render
#[derive(Debug, Clone, PartialEq)]
pub struct Messages {
    /// Shown by loading indicators
    pub loading: String,
    /// Shown when a request fails
    pub error: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            loading: "Loading...".to_string(),
            error: "An error has occurred!".to_string(),
        }
    }
}

/// Messages as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileMessages {
    pub loading: Option<String>,
    pub error: Option<String>,
}

impl Messages {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileMessages>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            loading: file.loading.unwrap_or(defaults.loading),
            error: file.error.unwrap_or(defaults.error),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Toolkit configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Process-wide debug switch; plugins may also set `options.debug`
    pub debug: DebugMode,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Localized widget strings
    pub messages: Messages,
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub debug: Option<FileDebug>,

    /// Optional [logging] section
    pub logging: Option<LoggingConfig>,

    /// Optional [messages] section
    pub messages: Option<FileMessages>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/toolkit/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("toolkit").join("config.toml"))
    }

    /// Load file config if it exists
    ///
    /// A missing file means defaults. A file that exists but cannot be
    /// read or parsed is an error: silently falling back would hide typos.
    fn load_file_config(path: &Path) -> Result<FileConfig> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read config file {}", path.display())),
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn load() -> Result<Self> {
        let file = match Self::config_path() {
            Some(path) => Self::load_file_config(&path)?,
            None => FileConfig::default(),
        };

        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    /// Load from an explicit file (used by `--config`)
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = Self::load_file_config(path)?;
        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    /// Combine a parsed file with an env lookup
    pub(crate) fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        // Debug: env > file > default
        let debug = env(DEBUG_ENV)
            .map(|v| DebugMode::from_str(&v))
            .or(file.debug.map(DebugMode::from))
            .unwrap_or_default();

        let logging = file.logging.unwrap_or_default();
        let messages = Messages::from_file(file.messages);

        Self {
            debug,
            logging,
            messages,
        }
    }
}
