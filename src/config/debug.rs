//! Debug switch shared by the process and by individual plugins
//!
//! Accepted spellings: `false`/`true`, `"verbose"`, and for env vars
//! `0`/`1`/`off`/`on`/`true`/`false`/`verbose`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How much an `emit` call reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DebugMode {
    /// No traces (default)
    #[default]
    Off,
    /// One structured trace per emitted event
    On,
    /// Trace plus a full instance state dump
    Verbose,
}

impl DebugMode {
    pub fn is_active(self) -> bool {
        self != Self::Off
    }

    /// Interpret a JSON option value (`options.debug`)
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(true) => Self::On,
            Value::String(s) => Self::from_str(s),
            Value::Number(n) => {
                if n.as_f64().is_some_and(|n| n != 0.0) {
                    Self::On
                } else {
                    Self::Off
                }
            }
            _ => Self::Off,
        }
    }

    /// Parse env/config text; unknown values disable debugging
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "verbose" => Self::Verbose,
            "1" | "true" | "on" | "yes" => Self::On,
            _ => Self::Off,
        }
    }

    /// TOML representation (`false`, `true`, `"verbose"`)
    pub fn as_toml(self) -> &'static str {
        match self {
            Self::Off => "false",
            Self::On => "true",
            Self::Verbose => "\"verbose\"",
        }
    }
}

/// `debug` as written in the config file: a boolean or a word
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FileDebug {
    Flag(bool),
    Word(String),
}

impl From<FileDebug> for DebugMode {
    fn from(file: FileDebug) -> Self {
        match file {
            FileDebug::Flag(true) => DebugMode::On,
            FileDebug::Flag(false) => DebugMode::Off,
            FileDebug::Word(word) => DebugMode::from_str(&word),
        }
    }
}
