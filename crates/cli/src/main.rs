//! Network Buffer Tuner CLI
//!
//! A command-line tool for auditing kernel network buffer configuration,
//! comparing it against tuning profiles, and applying a profile with a
//! backup taken first.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Network Buffer Tuner CLI
#[derive(Parser)]
#[command(name = "nbt")]
#[command(author, version, about = "Kernel network buffer tuning analyzer", long_about = None)]
pub struct Cli {
    /// Proc filesystem root (override to inspect a mounted snapshot)
    #[arg(long, env = "NBT_PROC_ROOT", default_value = "/proc")]
    pub proc_root: PathBuf,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit the current configuration and runtime state
    Audit,

    /// List the available tuning profiles
    Profiles,

    /// Diff the current configuration against a profile
    Recommend {
        /// Profile id (see `nbt profiles`)
        #[arg(long, short)]
        profile: String,
    },

    /// Apply a profile's recommended values, taking a backup first
    Apply {
        /// Profile id (see `nbt profiles`)
        #[arg(long, short)]
        profile: String,

        /// Compute and show the plan without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Where to write the pre-change backup
        #[arg(long, default_value = "nbt-backup.json")]
        backup_file: PathBuf,
    },

    /// Restore parameters from a previously written backup
    Restore {
        /// Backup file written by `nbt apply`
        #[arg(long)]
        backup_file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::TunerConfig::load()?;

    let code = match cli.command {
        Commands::Audit => commands::audit::run(&cli.proc_root, &config, cli.format).await?,
        Commands::Profiles => {
            commands::profiles::run(cli.format)?;
            ExitCode::SUCCESS
        }
        Commands::Recommend { profile } => {
            commands::tune::recommend(&cli.proc_root, &config, &profile, cli.format).await?;
            ExitCode::SUCCESS
        }
        Commands::Apply {
            profile,
            dry_run,
            backup_file,
        } => {
            commands::tune::apply(
                &cli.proc_root,
                &config,
                &profile,
                dry_run,
                &backup_file,
                cli.format,
            )
            .await?;
            ExitCode::SUCCESS
        }
        Commands::Restore { backup_file } => {
            commands::tune::restore(&cli.proc_root, &backup_file).await?;
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
