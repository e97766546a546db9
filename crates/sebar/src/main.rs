// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sebar - a rate-limited, abuse-resistant broadcast job engine.
//!
//! This is the binary entry point for the Sebar daemon and its
//! management CLI.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod hooks;
mod jobs;
mod serve;

/// Sebar - a rate-limited, abuse-resistant broadcast job engine.
#[derive(Parser, Debug)]
#[command(name = "sebar", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the broadcast worker, scheduler, and rescue loop.
    Serve,
    /// Create and manage broadcast jobs.
    Jobs {
        #[command(subcommand)]
        command: jobs::JobsCommand,
    },
    /// Reset stale running jobs abandoned by a crashed worker.
    Rescue {
        /// Only rescue jobs untouched for at least this many seconds.
        #[arg(long, default_value_t = 300)]
        older_than_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match sebar_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            sebar_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Jobs { command }) => jobs::run(config, command).await,
        Some(Commands::Rescue { older_than_secs }) => {
            jobs::run_rescue(config, older_than_secs).await
        }
        None => {
            println!("sebar: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
