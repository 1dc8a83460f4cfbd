//! Configuration loading for hn-mirror.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config dir>/hn-mirror/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::HnError;

/// Remote tree connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL of the Firebase tree
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// How often subscriptions poll their path
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound for a single remote read
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Synchronization engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Items per page of a ranked view
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Concurrent remote reads per fetch batch (clamped to 1..=8)
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Attempts per id before it is dead-lettered
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Re-fetch profiles named by the update log
    #[serde(default = "default_fetch_users")]
    pub fetch_users: bool,

    /// Pending change events buffered per subscription
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_page_size() -> usize {
    30
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_fetch_users() -> bool {
    true
}

fn default_event_buffer() -> usize {
    16
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            fetch_concurrency: default_fetch_concurrency(),
            max_attempts: default_max_attempts(),
            fetch_users: default_fetch_users(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Startup backfill of recent items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillSettings {
    #[serde(default = "default_backfill_enabled")]
    pub enabled: bool,

    /// Number of most recent item ids walked at startup
    #[serde(default = "default_backfill_window")]
    pub window: u64,

    /// Ids handed to the fetcher per batch
    #[serde(default = "default_backfill_chunk")]
    pub chunk_size: usize,

    /// Keep walking down from the lowest stored id to id 1
    #[serde(default)]
    pub resume_history: bool,
}

fn default_backfill_enabled() -> bool {
    true
}

fn default_backfill_window() -> u64 {
    1000
}

fn default_backfill_chunk() -> usize {
    100
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            enabled: default_backfill_enabled(),
            window: default_backfill_window(),
            chunk_size: default_backfill_chunk(),
            resume_history: false,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the Tantivy index directory
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Memory budget for the index writer in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub backfill: BackfillSettings,
}

fn default_index_path() -> String {
    ProjectDirs::from("", "", "hn-mirror")
        .map(|p| p.data_local_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./hn-index"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_writer_memory_mb() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            log_level: default_log_level(),
            writer_memory_mb: default_writer_memory_mb(),
            remote: RemoteSettings::default(),
            sync: SyncSettings::default(),
            backfill: BackfillSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (`<config dir>/hn-mirror/config.toml`)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (`HN_*`, `__` separates nested keys)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, HnError> {
        let config_dir = ProjectDirs::from("", "", "hn-mirror")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("index_path", default_index_path())
            .map_err(|e| HnError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| HnError::Config(e.to_string()))?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)
            .map_err(|e| HnError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: HN_LOG_LEVEL, HN_SYNC__PAGE_SIZE, HN_REMOTE__BASE_URL, etc.
        builder = builder.add_source(
            Environment::with_prefix("HN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| HnError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| HnError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), HnError> {
        if self.sync.page_size == 0 {
            return Err(HnError::Config("sync.page_size must be > 0".to_string()));
        }
        if self.sync.max_attempts == 0 {
            return Err(HnError::Config("sync.max_attempts must be > 0".to_string()));
        }
        if self.sync.event_buffer == 0 {
            return Err(HnError::Config("sync.event_buffer must be > 0".to_string()));
        }
        if self.backfill.chunk_size == 0 {
            return Err(HnError::Config(
                "backfill.chunk_size must be > 0".to_string(),
            ));
        }
        if self.remote.poll_interval_secs == 0 {
            return Err(HnError::Config(
                "remote.poll_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand ~ in index_path to the home directory
    pub fn expanded_index_path(&self) -> PathBuf {
        if let Some(rest) = self.index_path.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.index_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.sync.page_size, 30);
        assert_eq!(settings.sync.max_attempts, 3);
        assert_eq!(settings.remote.base_url, "https://hacker-news.firebaseio.com/v0");
        assert!(settings.backfill.enabled);
        assert!(!settings.backfill.resume_history);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.writer_memory_mb, 50);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hn.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "index_path = \"/tmp/hn\"\n[sync]\npage_size = 10\nfetch_users = false\n[backfill]\nwindow = 50"
        )
        .unwrap();

        let settings = Settings::load(Some(&path.to_string_lossy())).unwrap();
        assert_eq!(settings.index_path, "/tmp/hn");
        assert_eq!(settings.sync.page_size, 10);
        assert!(!settings.sync.fetch_users);
        assert_eq!(settings.sync.max_attempts, 3);
        assert_eq!(settings.backfill.window, 50);
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut settings = Settings::default();
        settings.sync.page_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sync.max_attempts = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_expanded_index_path() {
        let settings = Settings {
            index_path: "/var/lib/hn".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.expanded_index_path(), PathBuf::from("/var/lib/hn"));
    }
}
