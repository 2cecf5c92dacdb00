// Toolkit - widget plugin core with a demo driver
//
// Architecture:
// - Config: env > file > defaults, loaded before anything else
// - Logging: tracing subscriber (stderr + optional rolling JSON file)
// - CLI (clap): `demo` drives a Blackout overlay on the in-memory host,
//   `config` inspects the effective configuration

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use toolkit::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard = toolkit::logging::init(&config.logging)?;
    tracing::debug!("Configuration loaded (debug: {:?})", config.debug);

    cli::run(cli, config)
}
