//! CLI argument parsing for the hn-mirror daemon.
//!
//! Flags given here override the config file and environment.

use clap::{Parser, Subcommand};

/// Hacker News mirror daemon
///
/// Keeps a local index and the five ranked views in step with the
/// Hacker News API.
#[derive(Parser, Debug)]
#[command(name = "hn-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/hn-mirror/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override index path
    #[arg(long, global = true)]
    pub index_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start syncing
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(short, long)]
        foreground: bool,
    },

    /// Stop the running daemon
    Stop,

    /// Show daemon status
    Status,

    /// Query the local index
    Search(SearchArgs),

    /// Fetch items into the local index once
    Fetch {
        /// Item ids
        #[arg(required = true)]
        ids: Vec<u64>,
    },
}

/// Arguments of `search`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Free text over author, title and body
    pub text: Option<String>,

    /// Item type (default: story)
    #[arg(short = 't', long = "type")]
    pub item_type: Option<String>,

    /// newest, oldest or score
    #[arg(short, long)]
    pub sort: Option<String>,

    /// 1-based page number
    #[arg(short, long, default_value = "1")]
    pub page: u32,
}
