//! loansync CLI
//!
//! Administrative tools for a loan replica's data directory.
//!
//! # Commands
//!
//! - `inspect` - Show object count and sync status
//! - `get` - Print one stored loan
//! - `purge` - Delete one stored loan
//! - `reset-status` - Force a fresh bulk import on next start
//! - `apply-batch` - Dispatch a saved webhook batch offline
//!
//! Configuration comes from the same environment variables as the service
//! (`DATA_DIRECTORY`, `LOAN_CACHE_CAPACITY`, `LOG_LEVEL`, ...).

mod commands;

use clap::{Parser, Subcommand};
use loansync_engine::SyncConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// loansync replica administration.
#[derive(Parser)]
#[command(name = "loansync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory (overrides DATA_DIRECTORY)
    #[arg(global = true, short, long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show object count and sync status
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print one stored loan
    Get {
        /// Loan id
        id: String,
    },

    /// Delete one stored loan
    Purge {
        /// Loan id
        id: String,
    },

    /// Clear the synced flag so the next start re-imports
    ResetStatus,

    /// Dispatch a saved webhook batch against the local replica
    ApplyBatch {
        /// File holding a SubscriptionEventsBatch JSON body
        file: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = SyncConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_directory = dir;
    }

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let replica = commands::Replica::open(&config)?;
            commands::inspect::run(&replica, &format)?;
        }
        Commands::Get { id } => {
            let replica = commands::Replica::open(&config)?;
            commands::get::run(&replica, &id)?;
        }
        Commands::Purge { id } => {
            let replica = commands::Replica::open(&config)?;
            commands::purge::run(&replica, &id)?;
        }
        Commands::ResetStatus => {
            let replica = commands::Replica::open(&config)?;
            commands::reset_status::run(&replica)?;
        }
        Commands::ApplyBatch { file } => {
            let replica = commands::Replica::open(&config)?;
            commands::apply_batch::run(&replica, &config, &file)?;
        }
        Commands::Version => {
            println!("loansync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
