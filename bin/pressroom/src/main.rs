//! Pressroom CLI
//!
//! Generates static sites from content snapshots and publishes them to git.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use pressroom::cmd::{self, SiteJob, schedule::Schedule};
use pressroom_core::Config;
use tokio_util::sync::CancellationToken;

/// Command-line interface for Pressroom.
#[derive(Parser)]
#[command(
    name = "pressroom",
    version,
    about = "Generate and publish static sites from content snapshots"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pressroom.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Render a site into its workspace
    Generate {
        /// Site snapshot (YAML or JSON)
        snapshot: PathBuf,
    },
    /// Show what a publish would change without committing
    Plan {
        /// Site snapshot (YAML or JSON)
        snapshot: PathBuf,
    },
    /// Generate a site and push it to its publish branch
    Publish {
        /// Site snapshot (YAML or JSON)
        snapshot: PathBuf,
        /// Push the existing output without regenerating
        #[arg(long)]
        skip_generate: bool,
    },
    /// Export source records and push them to the backup branch
    Backup {
        /// Site snapshot (YAML or JSON)
        snapshot: PathBuf,
    },
    /// Generate and publish sites on an interval until interrupted
    Schedule {
        /// Site snapshots, one per site
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,
        /// Seconds between runs
        #[arg(long, default_value_t = 300)]
        every: u64,
        /// Also back up each site on every run
        #[arg(long)]
        backup: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    pressroom::init_tracing(cli.verbose);

    let config = Config::load_with_env(&cli.config).wrap_err("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    // Commands that clone into temp dirs turn Ctrl-C into cancellation so
    // the clone is removed before exit.
    let cancel = CancellationToken::new();
    if !matches!(cli.command, Commands::Generate { .. }) {
        cmd::cancel_on(tokio::signal::ctrl_c(), cancel.clone());
    }

    match cli.command {
        Commands::Generate { snapshot } => {
            let job = SiteJob::load(&config, &snapshot)?;
            cmd::generate::run(&job)?;
        }
        Commands::Plan { snapshot } => {
            let job = SiteJob::load(&config, &snapshot)?;
            cmd::run_blocking(move || cmd::plan::run(&job, &cancel)).await?;
        }
        Commands::Publish {
            snapshot,
            skip_generate,
        } => {
            let job = SiteJob::load(&config, &snapshot)?;
            cmd::run_blocking(move || cmd::publish::run(&job, skip_generate, &cancel)).await?;
        }
        Commands::Backup { snapshot } => {
            let job = SiteJob::load(&config, &snapshot)?;
            cmd::run_blocking(move || cmd::backup::run(&job, &cancel)).await?;
        }
        Commands::Schedule {
            snapshots,
            every,
            backup,
        } => {
            let schedule = Schedule {
                snapshots,
                every: Duration::from_secs(every.max(1)),
                backup,
            };
            cmd::schedule::run(config, schedule, cancel).await?;
        }
    }

    Ok(())
}
