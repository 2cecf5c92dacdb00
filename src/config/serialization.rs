//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

/// A TOML string literal with whatever escaping the value needs
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

impl Config {
    /// Render the configuration as a commented TOML document
    pub fn to_toml(&self) -> String {
        format!(
            r#"# toolkit configuration

# Debug traces for every emitted plugin event: false, true, "verbose"
# (TOOLKIT_DEBUG env var overrides)
debug = {debug}

# Logging configuration (RUST_LOG env var overrides both levels)
[logging]
level = {log_level}
# Level for forwarded plugin traces ("off" keeps them in memory only)
trace_level = {trace_level}
# File logging (in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir}
file_rotation = {log_file_rotation}  # hourly, daily, never
file_prefix = {log_file_prefix}

# Strings rendered by widgets
[messages]
loading = {loading}
error = {error}
"#,
            debug = self.debug.as_toml(),
            log_level = quoted(&self.logging.level),
            trace_level = quoted(&self.logging.trace_level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = quoted(&self.logging.file_dir.to_string_lossy()),
            log_file_rotation = quoted(&self.logging.file_rotation.to_string()),
            log_file_prefix = quoted(&self.logging.file_prefix),
            loading = quoted(&self.messages.loading),
            error = quoted(&self.messages.error),
        )
    }
}
