//! tidesync CLI
//!
//! Mirror an object store bucket against a local directory tree.
//!
//! # Commands
//!
//! - `backup` - download the store into a local directory
//! - `restore` - upload a local directory into the store
//!
//! Both commands persist a resume marker per task under the state
//! directory, so an interrupted run picks up where it left off. The
//! `--fill` flag re-attempts exactly the objects a previous run
//! recorded as ignored.

mod commands;
mod task;

use clap::{Args, Parser, Subcommand};
use commands::RunArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mirror a bucket against a local directory tree.
#[derive(Parser)]
#[command(name = "tidesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding task state and logs (default: ~/.tidesync)
    #[arg(global = true, long)]
    state_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Store root directory (a directory tree posing as the bucket)
    #[arg(long)]
    store: PathBuf,

    /// Local mirror directory
    #[arg(short, long)]
    directory: PathBuf,

    /// Concurrent transfers (default: 10 for backup, 3 for restore)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Retries per object before it is ignored
    #[arg(long, default_value = "3")]
    retry: u32,

    /// Abort once this many failures accumulate
    #[arg(long)]
    max_errors: Option<u64>,

    /// Stop registering after this many objects
    #[arg(long)]
    max_items: Option<u64>,

    /// Ignore the persisted resume marker and start from the beginning
    #[arg(long)]
    start_over: bool,

    /// Re-attempt the objects a previous run ignored
    #[arg(long)]
    fill: bool,
}

impl CommonArgs {
    fn run_args(&self) -> RunArgs {
        RunArgs {
            concurrency: self.concurrency,
            retry: self.retry,
            max_errors: self.max_errors,
            max_items: self.max_items,
            start_over: self.start_over,
            fill: self.fill,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download the store into a local directory
    Backup {
        #[command(flatten)]
        common: CommonArgs,

        /// Restrict to keys with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Overwrite an existing destination directory
        #[arg(long)]
        force: bool,
    },

    /// Upload a local directory into the store
    Restore {
        #[command(flatten)]
        common: CommonArgs,

        /// Suspend traversal while this many objects are queued
        #[arg(long, default_value = "1000")]
        max_queue: usize,
    },
}

fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tidesync")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state_dir = cli.state_dir.unwrap_or_else(default_state_dir);

    match cli.command {
        Commands::Backup {
            common,
            prefix,
            force,
        } => {
            commands::backup::run(
                &common.store,
                &common.directory,
                prefix,
                force,
                common.run_args(),
                &state_dir,
            )
            .await?;
        }
        Commands::Restore { common, max_queue } => {
            commands::restore::run(
                &common.store,
                &common.directory,
                max_queue,
                common.run_args(),
                &state_dir,
            )
            .await?;
        }
    }

    Ok(())
}
