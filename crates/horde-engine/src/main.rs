//! # Horde
//!
//! Headless entry point: loads `horde.toml`, runs the simulation for a fixed
//! number of simulated seconds and logs a summary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use horde_engine::config::{EngineConfig, CONFIG_FILE};
use horde_engine::runner::Runner;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Headless enemy behavior and combat simulation
#[derive(Parser, Debug)]
#[command(name = "horde")]
#[command(about = "Headless enemy behavior and combat simulation", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Simulated seconds to run, overriding the config
    #[arg(short, long)]
    seconds: Option<f32>,

    /// World seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Tracing filter directives, overriding the config
    #[arg(long)]
    log: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Write every simulation event to this file as JSON lines
    #[arg(long, value_name = "PATH")]
    events: Option<PathBuf>,

    /// Pace the simulation to the wall clock
    #[arg(long)]
    realtime: bool,

    /// Write the default configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.write_default_config {
        EngineConfig::default()
            .save_to(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = EngineConfig::load_from(&cli.config);
    if let Some(seconds) = cli.seconds {
        config.duration = seconds;
    }
    if let Some(seed) = cli.seed {
        config.world.seed = seed;
    }
    if let Some(filter) = cli.log {
        config.log_filter = filter;
    }
    config.validate();

    init_tracing(&config.log_filter, cli.json_logs)?;
    info!("Horde starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(config = %cli.config.display(), "configuration resolved");

    let mut runner = Runner::new(config)?;
    if let Some(path) = &cli.events {
        let file = File::create(path)
            .with_context(|| format!("failed to create event log {}", path.display()))?;
        runner = runner.with_event_log(Box::new(BufWriter::new(file)));
    }
    runner.run(cli.realtime)?;

    info!("Horde shutdown complete");
    Ok(())
}

fn init_tracing(filter: &str, json: bool) -> Result<()> {
    let mut env_filter = EnvFilter::from_default_env();
    for directive in filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        env_filter = env_filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("invalid log directive '{directive}'"))?,
        );
    }

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
    Ok(())
}
