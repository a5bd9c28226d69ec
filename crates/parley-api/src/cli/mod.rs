//! CLI definitions for the `parleyd` binary.
//!
//! Uses clap derive macros. `serve` runs the service; `sync` and `check`
//! are one-shot operator commands against the configured backends.

pub mod check;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use parley_types::config::BackendKind;

/// Chat service with graph, durable, and volatile storage.
#[derive(Parser)]
#[command(name = "parleyd", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines instead of pretty text.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Config file path. Defaults to $PARLEY_CONFIG, then {data_dir}/config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server and the background sync.
    Serve {
        /// Bind address (overrides config and PARLEY_HOST).
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides config and PARLEY_PORT).
        #[arg(long)]
        port: Option<u16>,

        /// Store family: memory or external.
        #[arg(long)]
        backend: Option<BackendKind>,
    },

    /// Merge one chat's volatile messages into its durable record.
    Sync {
        /// Chat identity to sync.
        chat_id: String,
    },

    /// Check that every configured store is reachable.
    Check,
}
