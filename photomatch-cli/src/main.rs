//! photomatch CLI - review client for the photomatch server.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod api;
mod client;
mod commands;
mod exit_codes;
mod utils;

use client::{ApiClient, RetryConfig};
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Request rejected as malformed
  65  Item cannot be matched as stored
  66  Item not found
  69  Server or store unavailable
  70  Server error
  75  Item was already decided differently (conflict)
  76  Unexpected server response";

#[derive(Parser)]
#[command(name = "photomatch")]
#[command(author, version, about = "Perceptual-hash duplicate review client", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Base URL of the photomatch server
    #[arg(long, global = true, env = "PHOTOMATCH_SERVER", default_value = "http://localhost:5000")]
    server: String,

    /// Stop retrying unavailable servers after this many seconds (0 disables retries)
    #[arg(long, global = true, env = "PHOTOMATCH_RETRY_SECS", default_value_t = 10)]
    retry_secs: u64,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the next review task
    Next {
        /// Number of unresolved items to skip
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// Print the raw task as JSON
        #[arg(long)]
        json: bool,
    },

    /// Confirm a match, or confirm that no match exists
    Commit {
        #[arg(value_name = "ITEM")]
        item: i64,

        /// Matched reference id
        #[arg(value_name = "REFERENCE", required_unless_present = "no_match")]
        reference: Option<i64>,

        /// Record that no reference matches this item
        #[arg(long, conflicts_with = "reference")]
        no_match: bool,
    },

    /// Discard an item's precomputed candidates and retrieve them live
    Rematch {
        #[arg(value_name = "ITEM")]
        item: i64,
    },

    /// Skip an item without matching it
    Skip {
        #[arg(value_name = "ITEM")]
        item: i64,
    },

    /// Commit every auto-selected match, leaving the rest for review
    Auto {
        /// Maximum number of tasks to examine
        #[arg(short, long, default_value_t = 100)]
        limit: u64,

        /// Report what would be committed without committing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "photomatch=debug"
    } else {
        "photomatch=warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(e) => ExitCode::from_anyhow(&e),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}

async fn run(cli: Cli) -> Result<()> {
    let retry = RetryConfig {
        max_elapsed: Duration::from_secs(cli.retry_secs),
        ..RetryConfig::default()
    };
    let client = ApiClient::new(&cli.server, retry)?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Next { offset, json } => commands::next::execute(&client, offset, json).await,
        Commands::Commit {
            item,
            reference,
            no_match,
        } => {
            let reference = if no_match { None } else { reference };
            commands::commit::execute(&client, item, reference, quiet).await
        }
        Commands::Rematch { item } => commands::commit::execute_rematch(&client, item, quiet).await,
        Commands::Skip { item } => commands::skip::execute(&client, item, quiet).await,
        Commands::Auto { limit, dry_run } => {
            commands::auto::execute(&client, limit, dry_run, quiet).await
        }
    }
}
