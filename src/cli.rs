//! CLI definitions for auto-accept.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// auto-accept CLI.
#[derive(Parser)]
#[command(name = "auto-accept")]
#[command(about = "Clicks accept and run actions in IDE agent panels over the DevTools protocol")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.auto-accept/config.toml if present)
    #[arg(short, long, env = "AUTO_ACCEPT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Drive every debuggable IDE page until interrupted (default)
    Run {
        /// IDE profile to use (cursor, antigravity)
        #[arg(long)]
        ide: Option<String>,

        /// Cycle through conversation tabs instead of polling the focused one
        #[arg(long)]
        background: bool,

        /// Delay between click passes in milliseconds
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Center of the probed debugging port window
        #[arg(long)]
        port: Option<u16>,
    },

    /// List debuggable pages on the configured ports
    Probe {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show this week's usage stats
    Stats {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Validate the configuration file
    CheckConfig,
}
