//! CLI for the gridfetch batch downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gridfetch_core::config::RunConfig;
use std::path::PathBuf;

use commands::{run_batch_cmd, run_provision, run_status, run_validate};

/// Top-level CLI for the gridfetch batch downloader.
#[derive(Debug, Parser)]
#[command(name = "gridfetch")]
#[command(about = "gridfetch: batch tile composite downloader", long_about = None)]
pub struct Cli {
    /// Path to the run configuration (TOML or JSON).
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the batch: fetch every missing tile of every configured chunk.
    Run {
        /// Cap on concurrent tile fetches (default: hardware threads minus one).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Provision per-zone grid assets without fetching anything.
    Provision,

    /// Sweep existing output, deleting artifacts with a wrong band count.
    Validate,

    /// Show per-chunk artifact counts for the configured run.
    Status,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = RunConfig::load(&cli.config)?;
        tracing::debug!("loaded config for {} ({})", cfg.country_name, cfg.start_date);

        match cli.command {
            CliCommand::Run { jobs } => run_batch_cmd(&cfg, jobs)?,
            CliCommand::Provision => run_provision(&cfg)?,
            CliCommand::Validate => run_validate(&cfg)?,
            CliCommand::Status => run_status(&cfg)?,
        }

        Ok(())
    }
}
