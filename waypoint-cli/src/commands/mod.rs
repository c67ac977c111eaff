//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod catalog;
mod job;
mod simulate;

use anyhow::Result;
use clap::Subcommand;
use waypoint_core::domain::catalog::{AnalysisConfig, Analyst};

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the step catalog of an analysis run
    Catalog {
        /// Analysts taking part, comma separated
        #[arg(long, value_delimiter = ',', default_value = "market,fundamentals")]
        analysts: Vec<Analyst>,

        /// Research depth (1-5)
        #[arg(long, default_value_t = 2)]
        depth: u8,
    },
    /// Run a scripted analysis job and monitor its progress
    Simulate {
        /// Analysts taking part, comma separated
        #[arg(long, value_delimiter = ',', default_value = "market,fundamentals")]
        analysts: Vec<Analyst>,

        /// Research depth (1-5)
        #[arg(long, default_value_t = 2)]
        depth: u8,

        /// Pause between scripted messages
        #[arg(long, default_value_t = 300)]
        step_delay_ms: u64,

        /// Fail the job once this step is reached
        #[arg(long)]
        fail_at: Option<usize>,
    },
    /// Show the progress of one job
    Show {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// List tracked jobs
    List {
        /// Only jobs that are still pending or running
        #[arg(long)]
        active: bool,
    },
    /// Follow a job until it finishes
    Watch {
        /// Job ID or unambiguous prefix
        id: String,

        /// Polling interval
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Remove records older than the retention
    Purge,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Catalog { analysts, depth } => {
            catalog::print_catalog(&AnalysisConfig::new(analysts, depth))
        }
        Commands::Simulate {
            analysts,
            depth,
            step_delay_ms,
            fail_at,
        } => {
            let options = simulate::SimulateOptions {
                analysis: AnalysisConfig::new(analysts, depth),
                step_delay_ms,
                fail_at,
            };
            simulate::run(options, config).await
        }
        Commands::Show { id } => job::show_job(config, &id).await,
        Commands::List { active } => job::list_jobs(config, active).await,
        Commands::Watch { id, interval_ms } => job::watch_job(config, &id, interval_ms).await,
        Commands::Purge => job::purge(config).await,
    }
}
