//! hn-mirror daemon library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (start, stop, status, search, fetch)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, SearchArgs};
pub use commands::{
    init_logging, load_settings, open_store, run_fetch, run_search, show_status, start_daemon,
    stop_daemon,
};
