//! Concrete widgets built on the plugin core

pub mod blackout;

pub use blackout::Blackout;
