//! Command implementations for the hn-mirror daemon.
//!
//! Handles:
//! - start: open the index, run the sync engine until signalled
//! - stop: signal the running daemon (via PID file)
//! - status: check if the daemon is running
//! - search: one-shot query of the local index
//! - fetch: one-shot fetch of items into the local index

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use hn_remote::{FirebaseClient, FirebaseConfig};
use hn_search::{SearchIndexConfig, TantivyItemStore};
use hn_service::{ListRequest, ListResponse, QueryService};
use hn_sync::{FetchReport, Fetcher, FetcherConfig, SyncEngine, ViewCache};
use hn_types::Settings;

use crate::cli::SearchArgs;

/// Load settings and apply CLI flags on top.
pub fn load_settings(
    config_path: Option<&str>,
    index_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(index_path) = index_path_override {
        settings.index_path = index_path.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the setting.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn pid_file_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| {
            #[cfg(unix)]
            {
                dirs.runtime_dir()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| dirs.cache_dir().to_path_buf())
            }
            #[cfg(not(unix))]
            {
                dirs.cache_dir().to_path_buf()
            }
        })
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("hn-mirror")
        .join("daemon.pid")
}

fn write_pid_file() -> Result<()> {
    let pid_path = pid_file_path();
    if let Some(parent) = pid_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&pid_path, std::process::id().to_string())?;
    info!(path = ?pid_path, "Wrote PID file");
    Ok(())
}

fn remove_pid_file() {
    let pid_path = pid_file_path();
    if pid_path.exists() {
        match fs::remove_file(&pid_path) {
            Ok(()) => info!("Removed PID file"),
            Err(e) => warn!(error = %e, "Failed to remove PID file"),
        }
    }
}

fn read_pid_file() -> Option<u32> {
    fs::read_to_string(pid_file_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    // Signal 0 only checks that the process exists
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

/// Open (or create) the on-disk item store.
pub fn open_store(settings: &Settings) -> Result<Arc<TantivyItemStore>> {
    let index_path = settings.expanded_index_path();
    fs::create_dir_all(&index_path).context("Failed to create index directory")?;

    let config = SearchIndexConfig::new(&index_path).with_memory_mb(settings.writer_memory_mb);
    let store = TantivyItemStore::open(config)
        .with_context(|| format!("Failed to open index at {:?} (is the daemon running?)", index_path))?;
    Ok(Arc::new(store))
}

fn firebase_client(settings: &Settings) -> Result<FirebaseClient> {
    let config = FirebaseConfig::from(&settings.remote)
        .with_subscription_buffer(settings.sync.event_buffer);
    FirebaseClient::new(config).context("Failed to build HTTP client")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

/// Start the daemon.
///
/// 1. Open the Tantivy index
/// 2. Start the sync engine against the Firebase API
/// 3. Wait for SIGINT/SIGTERM, then let running cycles finish
pub async fn start_daemon(settings: Settings, foreground: bool) -> Result<()> {
    info!("hn-mirror daemon starting...");
    info!("  Index path: {}", settings.index_path);
    info!("  Remote: {}", settings.remote.base_url);
    info!("  Page size: {}", settings.sync.page_size);
    info!("  Backfill: {}", settings.backfill.enabled);

    if !foreground {
        warn!("Background mode not implemented, running in foreground");
        warn!("Use a process manager (systemd, launchd) for background operation");
    }

    let store = open_store(&settings)?;
    let remote = Arc::new(firebase_client(&settings)?);

    let mut engine = SyncEngine::new(remote, store, &settings);
    engine.start();

    write_pid_file()?;

    shutdown_signal().await;

    engine.shutdown().await;
    remove_pid_file();

    info!("hn-mirror daemon stopped");
    Ok(())
}

/// Stop the running daemon by sending SIGTERM.
pub fn stop_daemon() -> Result<()> {
    let pid = read_pid_file().context("No PID file found - daemon may not be running")?;

    if !is_process_running(pid) {
        remove_pid_file();
        anyhow::bail!("Daemon not running (stale PID file removed)");
    }

    info!(pid, "Stopping daemon");

    #[cfg(unix)]
    {
        unsafe {
            if libc::kill(pid as i32, libc::SIGTERM) != 0 {
                anyhow::bail!("Failed to send SIGTERM to daemon");
            }
        }
        println!("Sent SIGTERM to daemon (PID {})", pid);
    }

    #[cfg(not(unix))]
    {
        anyhow::bail!("Stop command not yet implemented on this platform");
    }

    Ok(())
}

/// Show daemon status.
pub fn show_status() -> Result<()> {
    let pid_path = pid_file_path();

    match read_pid_file() {
        Some(pid) if is_process_running(pid) => {
            println!("hn-mirror daemon is running (PID {})", pid);
            println!("PID file: {:?}", pid_path);
        }
        Some(pid) => {
            println!(
                "hn-mirror daemon is NOT running (stale PID {} in {:?})",
                pid, pid_path
            );
        }
        None => println!("hn-mirror daemon is NOT running (no PID file)"),
    }
    Ok(())
}

/// Run one query against the local index.
///
/// Ranked views live in the daemon's memory, so only search is served here.
pub async fn run_search(settings: &Settings, args: &SearchArgs) -> Result<ListResponse> {
    let store = open_store(settings)?;
    let views = Arc::new(ViewCache::new(settings.sync.page_size));
    let service = QueryService::new(store, views);

    let request = ListRequest {
        text: args.text.clone(),
        item_type: args.item_type.clone(),
        sort: args.sort.clone(),
        page: Some(args.page),
        special: None,
    };
    Ok(service.list_items(&request).await)
}

/// Fetch the given items into the local index.
pub async fn run_fetch(settings: &Settings, ids: &[u64]) -> Result<FetchReport> {
    let store = open_store(settings)?;
    let remote = Arc::new(firebase_client(settings)?);
    let fetcher = Fetcher::new(remote, store, FetcherConfig::from_settings(settings));

    let report = fetcher.fetch_many(ids).await;
    for letter in &report.dead_letters {
        warn!(path = %letter.path, attempts = letter.attempts, error = %letter.error, "Fetch gave up");
    }
    Ok(report)
}
