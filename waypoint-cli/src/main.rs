//! Waypoint CLI
//!
//! Command-line interface for inspecting job progress. Works directly on a
//! file store directory, so it can watch jobs driven by another process.

mod commands;
mod config;
mod id_resolver;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Waypoint job progress CLI", long_about = None)]
struct Cli {
    /// Directory holding progress records
    #[arg(long, env = "WAYPOINT_STORE_DIR", default_value = ".waypoint")]
    store_dir: PathBuf,

    /// Seconds a record lives after its last update (0 keeps records forever)
    #[arg(long, env = "WAYPOINT_RETENTION_SECS", default_value_t = 86400)]
    retention_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypoint_cli=info,waypoint_tracker=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        store_dir: cli.store_dir,
        retention_secs: cli.retention_secs,
    };

    handle_command(cli.command, &config).await
}
