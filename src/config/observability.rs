//! Logging configuration
//!
//! The `[logging]` table deserializes straight into [`LoggingConfig`]; keys
//! left out take their defaults. `RUST_LOG` replaces the whole filter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing_appender::rolling::Rotation;

/// Target that plugin debug traces are forwarded to
pub const TRACE_TARGET: &str = "toolkit::trace";

/// How often the JSON log file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    /// Single file, never rolled
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

impl fmt::Display for LogRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        };
        f.write_str(word)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter for everything except plugin traces
    pub level: String,
    /// Filter for [`TRACE_TARGET`]; `"off"` keeps traces in memory only
    pub trace_level: String,
    /// Also write JSON logs to `file_dir`
    pub file_enabled: bool,
    pub file_dir: PathBuf,
    pub file_rotation: LogRotation,
    /// Rotated files are named `<prefix>.<date>`
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            trace_level: "info".to_string(),
            file_enabled: false,
            file_dir: PathBuf::from("./logs"),
            file_rotation: LogRotation::Daily,
            file_prefix: "toolkit".to_string(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directives: the base level plus the trace target's own
    pub fn directives(&self) -> String {
        format!("{},{}={}", self.level, TRACE_TARGET, self.trace_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        logging: LoggingConfig,
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let parsed: Wrapper =
            toml::from_str("[logging]\ntrace_level = \"off\"\nfile_rotation = \"hourly\"").unwrap();

        assert_eq!(parsed.logging.trace_level, "off");
        assert_eq!(parsed.logging.file_rotation, LogRotation::Hourly);
        assert_eq!(parsed.logging.level, "info");
        assert_eq!(parsed.logging.file_prefix, "toolkit");
    }

    #[test]
    fn test_unknown_rotation_is_rejected() {
        let parsed: Result<Wrapper, _> = toml::from_str("[logging]\nfile_rotation = \"weekly\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_directives_scope_trace_level() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            trace_level: "debug".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(config.directives(), "warn,toolkit::trace=debug");
    }

    #[test]
    fn test_rotation_display_matches_serde_name() {
        for rotation in [LogRotation::Hourly, LogRotation::Daily, LogRotation::Never] {
            let parsed: LogRotation =
                toml::Value::String(rotation.to_string()).try_into().unwrap();
            assert_eq!(parsed, rotation);
        }
    }
}
