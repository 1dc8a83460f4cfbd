//! hn-mirror daemon
//!
//! Mirrors the Hacker News API into a local Tantivy index and keeps the
//! top/new/ask/show/job views materialized.
//!
//! # Usage
//!
//! ```bash
//! hn-daemon start [--foreground] [--index-path PATH]
//! hn-daemon stop
//! hn-daemon status
//! hn-daemon search [TEXT] [--type TYPE] [--sort SORT] [--page N]
//! hn-daemon fetch ID...
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/hn-mirror/config.toml)
//! 3. Environment variables (HN_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use hn_daemon::{
    init_logging, load_settings, run_fetch, run_search, show_status, start_daemon, stop_daemon,
    Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stop => stop_daemon()?,
        Commands::Status => show_status()?,
        command => {
            let settings = load_settings(
                cli.config.as_deref(),
                cli.index_path.as_deref(),
                cli.log_level.as_deref(),
            )?;
            init_logging(&settings.log_level)?;

            match command {
                Commands::Start { foreground } => start_daemon(settings, foreground).await?,
                Commands::Search(args) => {
                    let response = run_search(&settings, &args).await?;
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                Commands::Fetch { ids } => {
                    let report = run_fetch(&settings, &ids).await?;
                    println!(
                        "attempted {} fetched {} missing {} failed {}",
                        report.attempted,
                        report.fetched,
                        report.missing,
                        report.dead_letters.len()
                    );
                }
                Commands::Stop | Commands::Status => {}
            }
        }
    }

    Ok(())
}
