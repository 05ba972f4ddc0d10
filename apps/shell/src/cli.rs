//! Command-line interface of the ModHub shell.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "modhubctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Inspect and load ModHub feature slices")]
pub(crate) struct Cli {
    /// Config file (TOML/JSON/YAML). Defaults to an optional `modhub.*` in the working directory.
    #[arg(short, long, global = true, env = "MODHUB_CONFIG")]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List registered features with their status
    List {
        /// Only features carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Load features (and their dependencies), then print what is loaded
    Load {
        #[arg(required = true)]
        features: Vec<String>,
        /// Give up waiting after this many milliseconds (overrides the config)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print registered, loaded and loading features
    Stats {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
