// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MedAdhere - offline-first action queue and sync daemon.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;
mod shutdown;
mod stack;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MedAdhere - offline-first action queue and sync daemon.
#[derive(Parser, Debug)]
#[command(name = "medadhere", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the XDG search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync core until interrupted.
    Serve {
        /// Read actions as JSON lines (`{"kind": ..., "payload": ...}`) from stdin.
        #[arg(long)]
        stdin: bool,
    },
    /// Submit one action.
    Enqueue {
        /// Action kind, e.g. `medication-add` or `mark-taken`.
        #[arg(long)]
        kind: String,
        /// Action payload as JSON.
        #[arg(long, default_value = "{}")]
        payload: String,
    },
    /// Run one replay pass against the sync endpoint.
    Replay,
    /// Show queue depth, health, and endpoint reachability.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// List queue data that failed to parse and was set aside.
    Quarantine {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => medadhere_config::load_and_validate_path(path),
        None => medadhere_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            medadhere_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level);

    let result = match cli.command {
        Some(Commands::Serve { stdin }) => serve::run_serve(config, stdin).await,
        Some(Commands::Enqueue { kind, payload }) => {
            commands::run_enqueue(&config, &kind, &payload).await
        }
        Some(Commands::Replay) => commands::run_replay(&config).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Quarantine { json }) => commands::run_quarantine(&config, json).await,
        None => {
            println!("medadhere: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("medadhere: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("medadhere={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
