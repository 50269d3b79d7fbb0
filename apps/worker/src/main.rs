#![warn(clippy::all)]

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod config;
mod logs;
mod monitoring;
mod notify;
mod orchestrator;
mod storage;

#[cfg(test)]
mod testing;

use config::Config;
use orchestrator::Orchestrator;

/// Background worker that probes registered HTTP/HTTPS checks and alerts
/// their owners when reachability changes
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config file (created with defaults if missing)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_ref())?;
    info!("{}", config);

    let orchestrator = Orchestrator::from_config(&config).await?;
    let handles = orchestrator.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down, abandoning in-flight probes");

    for handle in handles {
        handle.abort();
    }

    Ok(())
}
