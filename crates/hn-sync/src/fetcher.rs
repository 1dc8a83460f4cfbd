//! Fetching items and users from the remote tree into the item store.
//!
//! Single fetches make exactly one remote read. Batch fetches run with a
//! bounded number of reads in flight, retry transient failures with
//! exponential backoff, dead-letter ids that never succeed and commit the
//! store once when the whole batch has been attempted.

use std::sync::Arc;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use hn_remote::{RemoteError, RemotePath, RemoteSource};
use hn_search::ItemStore;
use hn_types::{Item, Settings, User};

use crate::error::SyncError;

/// Upper bound on reads in flight for one batch.
pub const MAX_FETCH_CONCURRENCY: usize = 8;

/// Configuration for the fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Reads in flight per batch, clamped to 1..=8
    pub concurrency: usize,
    /// Total attempts per id in a batch before it is dead-lettered
    pub max_attempts: u32,
    /// Upper bound for a single remote read
    pub request_timeout: Duration,
    /// First retry delay
    pub initial_backoff: Duration,
    /// Longest retry delay
    pub max_backoff: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_attempts: 3,
            request_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl FetcherConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            concurrency: settings.sync.fetch_concurrency,
            max_attempts: settings.sync.max_attempts,
            request_timeout: Duration::from_secs(settings.remote.request_timeout_secs),
            ..Default::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Concurrency actually used for batches.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_FETCH_CONCURRENCY)
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            current_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// An id whose fetch never succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub path: RemotePath,
    pub attempts: u32,
    pub error: String,
}

/// Outcome of a batch fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    /// Ids handed to the batch
    pub attempted: usize,
    /// Ids read and stored
    pub fetched: usize,
    /// Ids with no value upstream
    pub missing: usize,
    pub dead_letters: Vec<DeadLetter>,
}

impl FetchReport {
    pub fn is_clean(&self) -> bool {
        self.dead_letters.is_empty()
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fetched => self.fetched += 1,
            Outcome::Missing => self.missing += 1,
            Outcome::DeadLetter(letter) => self.dead_letters.push(letter),
        }
    }
}

enum Outcome {
    Fetched,
    Missing,
    DeadLetter(DeadLetter),
}

/// Reads items and users upstream and upserts them locally.
pub struct Fetcher {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn ItemStore>,
    config: FetcherConfig,
}

impl Fetcher {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn ItemStore>,
        config: FetcherConfig,
    ) -> Self {
        Self {
            remote,
            store,
            config,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch one item and make it visible in the store.
    ///
    /// Returns `None` when the item does not exist upstream or any step
    /// fails; failures are logged, never returned.
    pub async fn fetch(&self, id: u64) -> Option<Item> {
        let path = RemotePath::Item(id);
        let value = self.read_logged(&path).await?;

        let item = match self.store_item(value).await {
            Ok(item) => item,
            Err(e) => {
                warn!(item_id = id, error = %e, "Failed to store item");
                return None;
            }
        };

        if let Err(e) = self.store.commit().await {
            warn!(item_id = id, error = %e, "Failed to commit item");
            return None;
        }

        debug!(item_id = id, item_type = %item.item_type, "Fetched item");
        Some(item)
    }

    /// Fetch one user profile and make it visible in the store.
    pub async fn fetch_user(&self, handle: &str) -> Option<User> {
        let path = RemotePath::User(handle.to_string());
        let value = self.read_logged(&path).await?;

        let user = match self.store_user(value).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user = handle, error = %e, "Failed to store user");
                return None;
            }
        };

        if let Err(e) = self.store.commit().await {
            warn!(user = handle, error = %e, "Failed to commit user");
            return None;
        }

        debug!(user = handle, "Fetched user");
        Some(user)
    }

    /// Fetch every id, retrying transient failures.
    ///
    /// Returns once each id has been fetched, found missing or
    /// dead-lettered. Successful upserts are committed before returning.
    pub async fn fetch_many(&self, ids: &[u64]) -> FetchReport {
        let paths = ids.iter().map(|id| RemotePath::Item(*id)).collect();
        self.fetch_paths(paths, "items").await
    }

    /// Fetch every user profile, retrying transient failures.
    pub async fn fetch_users(&self, handles: &[String]) -> FetchReport {
        let paths = handles
            .iter()
            .map(|handle| RemotePath::User(handle.clone()))
            .collect();
        self.fetch_paths(paths, "users").await
    }

    async fn fetch_paths(&self, paths: Vec<RemotePath>, kind: &'static str) -> FetchReport {
        let mut report = FetchReport {
            attempted: paths.len(),
            ..Default::default()
        };
        if paths.is_empty() {
            return report;
        }

        let outcomes: Vec<Outcome> = stream::iter(paths)
            .map(|path| self.sync_path(path))
            .buffer_unordered(self.config.effective_concurrency())
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }

        if report.fetched > 0 {
            if let Err(e) = self.store.commit().await {
                warn!(kind, error = %e, "Failed to commit fetched batch");
            }
        }

        if report.is_clean() {
            debug!(
                kind,
                attempted = report.attempted,
                fetched = report.fetched,
                missing = report.missing,
                "Batch fetch complete"
            );
        } else {
            info!(
                kind,
                attempted = report.attempted,
                fetched = report.fetched,
                missing = report.missing,
                dead_letters = report.dead_letters.len(),
                "Batch fetch complete with dead letters"
            );
        }

        report
    }

    async fn sync_path(&self, path: RemotePath) -> Outcome {
        let (value, attempts) = match self.read_with_retry(&path).await {
            Ok((Some(value), attempts)) => (value, attempts),
            Ok((None, _)) => {
                debug!(path = %path, "Missing upstream");
                return Outcome::Missing;
            }
            Err((e, attempts)) => {
                warn!(path = %path, attempts, error = %e, "Dead-lettering fetch");
                return Outcome::DeadLetter(DeadLetter {
                    path,
                    attempts,
                    error: e.to_string(),
                });
            }
        };

        let stored = match &path {
            RemotePath::User(_) => self.store_user(value).await.map(|_| ()),
            _ => self.store_item(value).await.map(|_| ()),
        };

        match stored {
            Ok(()) => Outcome::Fetched,
            Err(e) => {
                warn!(path = %path, error = %e, "Dead-lettering unstorable value");
                Outcome::DeadLetter(DeadLetter {
                    path,
                    attempts,
                    error: e.to_string(),
                })
            }
        }
    }

    /// One remote read bounded by the request timeout.
    async fn read_once(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError> {
        match tokio::time::timeout(self.config.request_timeout, self.remote.read(path)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    async fn read_logged(&self, path: &RemotePath) -> Option<Value> {
        match self.read_once(path).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!(path = %path, "Missing upstream");
                None
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Remote read failed");
                None
            }
        }
    }

    async fn read_with_retry(
        &self,
        path: &RemotePath,
    ) -> Result<(Option<Value>, u32), (SyncError, u32)> {
        let mut backoff = self.config.backoff();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.read_once(path).await {
                Ok(value) => return Ok((value, attempts)),
                Err(e) => {
                    let e = SyncError::from(e);
                    if attempts >= max_attempts || !e.is_transient() {
                        return Err((e, attempts));
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            debug!(
                                path = %path,
                                attempt = attempts,
                                error = %e,
                                retry_in_ms = duration.as_millis() as u64,
                                "Remote read failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => return Err((e, attempts)),
                    }
                }
            }
        }
    }

    async fn store_item(&self, value: Value) -> Result<Item, SyncError> {
        let item = Item::from_value(value)?;
        self.store.upsert_item(&item).await?;
        Ok(item)
    }

    async fn store_user(&self, value: Value) -> Result<User, SyncError> {
        let user = User::from_value(value)?;
        self.store.upsert_user(&user).await?;
        Ok(user)
    }
}
