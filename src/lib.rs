//! Widget toolkit core
//!
//! A base "plugin" abstraction for page widgets, written against an
//! abstract host page ([`dom::Dom`]):
//!
//! - Plugin: lifecycle state machine (initialize, enable/disable,
//!   mount/unmount, destroy) shared by every widget kind
//! - Options: layered defaults, caller options, responsive overrides and
//!   `on<Event>` handler extraction
//! - Binds: declarative DOM listener tables compiled once per instance
//! - Events: internal pub/sub plus namespaced custom DOM events
//!
//! The [`toolkit::Toolkit`] context carries the state instances share
//! (debug switch, UID counters, debug traces, messages, singletons).

pub mod config;
pub mod dom;
pub mod error;
pub mod logging;
pub mod merge;
pub mod plugin;
pub mod toolkit;
pub mod widgets;

pub use error::ToolkitError;
pub use plugin::{Component, Plugin, PluginHandle, Widget};
pub use toolkit::Toolkit;
