// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - demo: drive a Blackout overlay on the in-memory host and print the trace
// - config --show: Display effective configuration
// - config --path: Show config file path
// - config --reset: Regenerate config file with defaults

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use toolkit::config::{Config, DebugMode, VERSION};
use toolkit::dom::{dom_listener, Dom, MemoryDom, Target};
use toolkit::plugin::{listener, Component};
use toolkit::widgets::Blackout;
use toolkit::Toolkit;

/// Toolkit - widget plugin core
#[derive(Parser)]
#[command(name = "toolkit")]
#[command(version = VERSION)]
#[command(about = "Lifecycle, options and event-wiring core for page widgets", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a Blackout overlay through its lifecycle and print the debug trace
    Demo {
        /// Record emitted events
        #[arg(long)]
        debug: bool,

        /// Record emitted events with full instance state
        #[arg(long)]
        verbose: bool,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

pub fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Demo { debug, verbose } => run_demo(&config, debug, verbose),
        Commands::Config { show, reset, path } => {
            if path {
                handle_config_path(cli.config.as_deref())
            } else if show {
                handle_config_show(&config, cli.config.as_deref());
                Ok(())
            } else if reset {
                handle_config_reset(cli.config.as_deref())
            } else {
                // No flag provided, show help
                println!("Usage: toolkit config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
                Ok(())
            }
        }
    }
}

fn run_demo(config: &Config, debug: bool, verbose: bool) -> Result<()> {
    let toolkit = Toolkit::from_config(config);
    if verbose {
        toolkit.set_debug(DebugMode::Verbose);
    } else if debug {
        toolkit.set_debug(DebugMode::On);
    }

    let memory = MemoryDom::shared();
    let dom: Rc<dyn Dom> = memory.clone();

    // Page-side observers see the namespaced custom events bubble up
    for event in ["shown.toolkit.blackout", "hidden.toolkit.blackout"] {
        dom.add_listener(
            Target::Document,
            event,
            dom_listener(move |e| {
                let args = e.detail().map(|d| d.arguments.clone()).unwrap_or_default();
                println!("  page   <- {} {:?}", e.name(), args);
            }),
        );
    }

    let blackout = Blackout::instance(&toolkit, &dom, json!({"closeOnClick": true}))
        .context("Failed to build Blackout")?;
    blackout.borrow_mut().on(
        "shown",
        listener(|component, args| {
            println!("  plugin <- {} shown {:?}", component.name(), args);
            Ok(())
        }),
    );

    {
        let overlay = blackout.borrow();
        println!("Blackout {} (uid {})", overlay.version(), overlay.uid());
    }
    {
        let mut overlay = blackout.borrow_mut();
        overlay.show();
        overlay.show();
        overlay.hide();
        println!("  open count after show, show, hide: {}", overlay.count());
    }

    let element = blackout
        .borrow()
        .element()
        .context("Blackout rendered no element")?;
    memory.fire(Target::Node(element), "click");
    println!("  open count after click: {}", blackout.borrow().count());

    blackout.borrow_mut().destroy();
    println!("  destroyed, listeners left: {}", memory.total_listeners());

    let traces = toolkit.traces().get_all();
    if traces.is_empty() {
        println!();
        println!("No trace recorded (run with --debug or --verbose)");
        return Ok(());
    }

    println!();
    println!("Trace ({} events):", traces.len());
    for entry in traces {
        println!(
            "  {} {:<12} {:<12} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.label(),
            entry.event,
            serde_json::Value::Array(entry.args)
        );
        if let Some(state) = entry.state {
            println!("      state: {}", state);
        }
    }

    Ok(())
}

fn handle_config_path(explicit: Option<&Path>) -> Result<()> {
    let path = target_path(explicit)?;
    println!("{}", path.display());
    Ok(())
}

/// The `--config` file if given, else the default location
fn target_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_path().context("Could not determine config path"),
    }
}

fn handle_config_show(config: &Config, explicit: Option<&Path>) {
    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    // Show source info
    println!();
    if let Ok(path) = target_path(explicit) {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset(explicit: Option<&Path>) -> Result<()> {
    let path = target_path(explicit)?;

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    // Write the default config (using Config's single source of truth)
    std::fs::write(&path, Config::default().to_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_path_wins() {
        let explicit = Path::new("/tmp/elsewhere.toml");
        assert_eq!(target_path(Some(explicit)).unwrap(), explicit);
        assert_eq!(target_path(None).ok(), Config::config_path());
    }

    #[test]
    fn test_reset_writes_explicit_file() {
        let dir = std::env::temp_dir().join(format!("toolkit-cli-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");

        handle_config_reset(Some(path.as_path())).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(written, Config::default().to_toml());
    }

    #[test]
    fn test_cli_accepts_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["toolkit", "config", "--reset", "--config", "alt.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(cli.command, Commands::Config { reset: true, .. }));
    }
}
