// Logging module - debug traces and subscriber setup
//
// Plugins in debug mode record one TraceEntry per emitted event. Entries are
// kept in a bounded in-memory buffer (so tests and tools can inspect them) and
// are also forwarded to tracing on the `toolkit::trace` target.

use crate::config::{LoggingConfig, TRACE_TARGET};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Maximum number of trace entries to keep in memory
const MAX_TRACE_ENTRIES: usize = 1000;

/// A single debug trace produced by `emit`
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,
    /// Plugin kind name
    pub name: String,
    pub uid: u64,
    pub event: String,
    pub args: Vec<Value>,
    /// Full instance state, verbose mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

impl TraceEntry {
    /// `Name#uid`, the correlation label used in log lines
    pub fn label(&self) -> String {
        format!("{}#{}", self.name, self.uid)
    }
}

/// In-memory trace buffer with bounded size (ring buffer)
#[derive(Debug, Default)]
pub struct TraceBuffer {
    entries: RefCell<VecDeque<TraceEntry>>,
}

impl TraceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry and forward it to tracing
    /// If the buffer is full, removes the oldest entry
    pub fn record(&self, entry: TraceEntry) {
        let args = Value::Array(entry.args.clone());
        tracing::info!(
            target: TRACE_TARGET,
            plugin = %entry.label(),
            event = %entry.event,
            args = %args,
            "emit"
        );
        if let Some(state) = &entry.state {
            tracing::info!(target: TRACE_TARGET, plugin = %entry.label(), state = %state, "state");
        }

        let mut entries = self.entries.borrow_mut();
        if entries.len() >= MAX_TRACE_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Get all trace entries (most recent last)
    pub fn get_all(&self) -> Vec<TraceEntry> {
        self.entries.borrow().iter().cloned().collect()
    }

    /// Event names in recording order
    pub fn events(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// Install the global subscriber: stderr output plus optional JSON file
///
/// The returned guard must be kept alive for the duration of the program to
/// ensure file logs flush.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.directives()));

    if !config.file_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(None);
    }

    std::fs::create_dir_all(&config.file_dir).with_context(|| {
        format!(
            "Failed to create log directory {}",
            config.file_dir.display()
        )
    })?;

    let file_appender = RollingFileAppender::builder()
        .rotation(config.file_rotation.into())
        .filename_prefix(config.file_prefix.clone())
        .build(&config.file_dir)
        .context("Failed to create log file appender")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File layer uses JSON format for structured log parsing
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Some(guard))
}
