//! playmuxd: media session service.
//!
//! Registers the builtin backends, loads the service configuration and drives
//! sessions from the command line.

mod cli;
mod runtime;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,playmuxd=info,playmux_core=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let config = runtime::load_config(args.config.as_deref())?;
    let manager = runtime::build_manager(config)?;

    match args.cmd {
        cli::Command::Plugins => runtime::list_plugins(&manager),
        cli::Command::Probe { uri } => runtime::run_probe(&manager, &uri),
        cli::Command::Play {
            uri,
            seconds,
            volume,
        } => runtime::run_play(&manager, &uri, seconds, volume),
        cli::Command::Outputs => runtime::show_outputs(&manager),
    }
}
