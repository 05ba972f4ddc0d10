#![allow(clippy::print_stdout)]

mod cli;
mod commands;

use crate::cli::{Cli, Command};
use anyhow::Result;
use clap::Parser;
use modhub::domain::config::AppConfig;
use modhub::kernel::config::load_config;
use modhub_logger::Logger;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config: AppConfig = load_config(cli.config.as_deref())?;
    let _logger = Logger::from_config(env!("CARGO_PKG_NAME"), &config.logging)?;

    let manager = modhub::start(&config.features).await?;

    let output = match cli.command {
        Command::List { tag } => commands::list(&manager, tag.as_deref())?,
        Command::Load { features, timeout_ms } => {
            let timeout = timeout_ms.map(Duration::from_millis).or_else(|| config.features.load_timeout());
            commands::load(&manager, &features, timeout).await?
        },
        Command::Stats { json } => commands::stats(&manager, json)?,
    };
    print!("{output}");

    Ok(())
}
