use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "playmuxd", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Service configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered plugins
    Plugins,

    /// Load a backend for a URI in the paused state and print what it reports
    Probe {
        /// Media URI, e.g. file:///music/a.flac or dvb://474.2
        uri: String,
    },

    /// Play a URI and print session events as JSON lines
    Play {
        /// Media URI
        uri: String,

        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,

        /// Initial volume (0-100)
        #[arg(long, default_value_t = 50)]
        volume: i32,
    },

    /// Show display and audio output settings
    Outputs,
}
