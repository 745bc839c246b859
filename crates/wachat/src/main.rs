// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! wachat - WhatsApp inbox engine.
//!
//! This is the binary entry point: it loads configuration, installs
//! tracing, and runs one subcommand against the local chat store.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod inbox;
mod ingest;
mod shutdown;
mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

use wachat_config::WachatConfig;
use wachat_core::WachatError;

/// wachat - WhatsApp inbox engine.
#[derive(Parser, Debug)]
#[command(name = "wachat", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest newline-delimited JSON payloads from a file or stdin.
    Ingest {
        /// Read payloads from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Replace local chats and messages with a full FastWAPI sync.
    Sync,
    /// List chats, most recent first.
    Chats {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show the messages exchanged with a phone number.
    Messages {
        phone: String,
        /// Print JSON instead of text lines.
        #[arg(long)]
        json: bool,
    },
    /// Open (creating if needed) the chat for a phone number.
    Open {
        phone: String,
        /// Display name for a new chat.
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => wachat_config::load_and_validate_path(path),
        None => wachat_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            wachat_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level);

    if let Err(e) = run(cli.command, &config).await {
        error!(error = %e, "command failed");
        eprintln!("wachat: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &WachatConfig) -> Result<(), WachatError> {
    match command {
        Commands::Ingest { file } => {
            let cancel = shutdown::install_signal_handler();
            ingest::run_ingest(config, file.as_deref(), cancel).await?;
            Ok(())
        }
        Commands::Sync => {
            let cancel = shutdown::install_signal_handler();
            sync::run_sync(config, cancel).await
        }
        Commands::Chats { json } => inbox::run_chats(config, json).await,
        Commands::Messages { phone, json } => inbox::run_messages(config, &phone, json).await,
        Commands::Open { phone, name } => inbox::run_open(config, &phone, name).await,
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wachat={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
