//! In-process remote source for tests.
//!
//! Values are set directly, reads are counted per path, and failures or
//! delays can be injected per path. Publishing a value pushes it to every
//! live subscription of that path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::RemoteError;
use crate::path::RemotePath;
use crate::source::{RemoteEvent, RemoteSource, Subscription};

const SUBSCRIPTION_BUFFER: usize = 16;

/// Deterministic [`RemoteSource`] backed by a map.
#[derive(Default)]
pub struct MockRemote {
    values: Mutex<HashMap<RemotePath, Value>>,
    reads: Mutex<HashMap<RemotePath, usize>>,
    /// Remaining injected failures per path
    failures: Mutex<HashMap<RemotePath, usize>>,
    delays: Mutex<HashMap<RemotePath, Duration>>,
    subscribers: Mutex<HashMap<RemotePath, Vec<mpsc::Sender<RemoteEvent>>>>,
    unavailable: AtomicBool,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Counts one read as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value without notifying subscribers.
    pub fn set(&self, path: RemotePath, value: Value) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(path, value);
        }
    }

    /// Remove a value so reads return nothing.
    pub fn remove(&self, path: &RemotePath) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(path);
        }
    }

    /// Store a value and deliver it to every subscriber of the path.
    pub async fn publish(&self, path: RemotePath, value: Value) {
        self.set(path.clone(), value.clone());
        self.deliver(&path, RemoteEvent::Value(value)).await;
    }

    /// Deliver an error event to every subscriber of the path.
    pub async fn publish_error(&self, path: RemotePath, error: RemoteError) {
        self.deliver(&path, RemoteEvent::Error(error)).await;
    }

    /// Fail the next `times` reads of `path` with a transient error.
    pub fn fail_next(&self, path: RemotePath, times: usize) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(path, times);
        }
    }

    /// Fail every read of `path`.
    pub fn fail_always(&self, path: RemotePath) {
        self.fail_next(path, usize::MAX);
    }

    /// Delay every read of `path`.
    pub fn delay(&self, path: RemotePath, delay: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.insert(path, delay);
        }
    }

    /// Fail every read regardless of path.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Largest number of reads that were running at the same time.
    pub fn peak_reads_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter_read(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }

    /// Reads issued against `path` so far.
    pub fn read_count(&self, path: &RemotePath) -> usize {
        self.reads
            .lock()
            .map(|reads| reads.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Reads issued against any `item/{id}` path so far.
    pub fn item_reads(&self) -> usize {
        self.reads
            .lock()
            .map(|reads| {
                reads
                    .iter()
                    .filter(|(path, _)| matches!(path, RemotePath::Item(_)))
                    .map(|(_, count)| *count)
                    .sum()
            })
            .unwrap_or(0)
    }

    async fn deliver(&self, path: &RemotePath, event: RemoteEvent) {
        let senders = self
            .subscribers
            .lock()
            .map(|subs| subs.get(path).cloned().unwrap_or_default())
            .unwrap_or_default();

        for tx in senders {
            let _ = tx.send(event.clone()).await;
        }
    }

    fn take_failure(&self, path: &RemotePath) -> bool {
        let Ok(mut failures) = self.failures.lock() else {
            return false;
        };
        match failures.get_mut(path) {
            Some(0) | None => false,
            Some(remaining) => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                true
            }
        }
    }
}

#[async_trait]
impl RemoteSource for MockRemote {
    async fn read(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError> {
        let _in_flight = self.enter_read();
        if let Ok(mut reads) = self.reads.lock() {
            *reads.entry(path.clone()).or_insert(0) += 1;
        }

        let delay = self
            .delays
            .lock()
            .ok()
            .and_then(|delays| delays.get(path).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.unavailable.load(Ordering::SeqCst) || self.take_failure(path) {
            return Err(RemoteError::Status {
                path: path.path(),
                status: 503,
            });
        }

        Ok(self
            .values
            .lock()
            .ok()
            .and_then(|values| values.get(path).cloned())
            .filter(|value| !value.is_null()))
    }

    fn subscribe(&self, path: RemotePath) -> Subscription {
        let (tx, subscription) = Subscription::channel(SUBSCRIPTION_BUFFER);

        let current = self
            .values
            .lock()
            .ok()
            .and_then(|values| values.get(&path).cloned());
        if let Some(value) = current {
            let _ = tx.try_send(RemoteEvent::Value(value));
        }

        if let Ok(mut subs) = self.subscribers.lock() {
            subs.entry(path).or_default().push(tx);
        }
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_counts_and_missing() {
        let remote = MockRemote::new();
        remote.set(RemotePath::Item(1), json!({"id": 1, "type": "story"}));

        assert!(remote.read(&RemotePath::Item(1)).await.unwrap().is_some());
        assert!(remote.read(&RemotePath::Item(2)).await.unwrap().is_none());
        assert_eq!(remote.read_count(&RemotePath::Item(1)), 1);
        assert_eq!(remote.item_reads(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let remote = MockRemote::new();
        remote.set(RemotePath::MaxItem, json!(100));
        remote.fail_next(RemotePath::MaxItem, 2);

        assert!(remote.read(&RemotePath::MaxItem).await.is_err());
        assert!(remote.read(&RemotePath::MaxItem).await.is_err());
        assert_eq!(
            remote.read(&RemotePath::MaxItem).await.unwrap(),
            Some(json!(100))
        );
    }

    #[tokio::test]
    async fn test_peak_reads_in_flight() {
        let remote = MockRemote::new();
        remote.delay(RemotePath::Item(1), Duration::from_millis(20));
        remote.delay(RemotePath::Item(2), Duration::from_millis(20));

        let one = RemotePath::Item(1);
        let two = RemotePath::Item(2);
        let _ = tokio::join!(remote.read(&one), remote.read(&two));
        let _ = remote.read(&RemotePath::Item(3)).await;

        assert_eq!(remote.peak_reads_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_subscription_gets_current_then_published() {
        let remote = MockRemote::new();
        remote.set(RemotePath::Updates, json!({"items": [1]}));

        let mut sub = remote.subscribe(RemotePath::Updates);
        assert_eq!(
            sub.next().await,
            Some(RemoteEvent::Value(json!({"items": [1]})))
        );

        remote
            .publish(RemotePath::Updates, json!({"items": [2]}))
            .await;
        assert_eq!(
            sub.next().await,
            Some(RemoteEvent::Value(json!({"items": [2]})))
        );
    }
}
