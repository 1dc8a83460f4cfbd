//! Per-category change reconciliation.
//!
//! A reconciler follows one ranked list. Each new value runs one cycle:
//!
//! 1. `Diffing`: ids not seen in the previous value
//! 2. `Fetching`: fetch those ids into the store
//! 3. `Rebuilding`: resolve the whole list from the store and swap the
//!    category's view
//!
//! Cycles never overlap. Values that arrive during a cycle wait in the
//! subscription's bounded channel and are processed in order afterwards.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hn_remote::{RemoteEvent, Subscription};
use hn_search::ItemStore;
use hn_types::{parse_ranked_ids, Category, Item, RankedIds};

use crate::differ::diff;
use crate::error::SyncError;
use crate::fetcher::{FetchReport, Fetcher};
use crate::view::{PaginatedView, ViewCache};

/// Where a reconciler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Idle,
    Diffing,
    Fetching,
    Rebuilding,
}

impl ReconcileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileState::Idle => "idle",
            ReconcileState::Diffing => "diffing",
            ReconcileState::Fetching => "fetching",
            ReconcileState::Rebuilding => "rebuilding",
        }
    }
}

/// Summary of one reconcile cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub category: Category,
    /// Length of the ranked list this cycle processed
    pub listed: usize,
    /// Ids that were not in the previous list
    pub new_ids: usize,
    pub fetch: FetchReport,
    /// False when the view was left as it was
    pub rebuilt: bool,
    /// Items in the view after the cycle
    pub total_count: usize,
}

/// Keeps one category's view in step with its ranked list.
pub struct ChangeReconciler {
    category: Category,
    fetcher: Arc<Fetcher>,
    store: Arc<dyn ItemStore>,
    views: Arc<ViewCache>,
    last_seen: Mutex<Option<RankedIds>>,
    state: watch::Sender<ReconcileState>,
}

impl ChangeReconciler {
    pub fn new(
        category: Category,
        fetcher: Arc<Fetcher>,
        store: Arc<dyn ItemStore>,
        views: Arc<ViewCache>,
    ) -> Self {
        let (state, _) = watch::channel(ReconcileState::Idle);
        Self {
            category,
            fetcher,
            store,
            views,
            last_seen: Mutex::new(None),
            state,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn state(&self) -> ReconcileState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ReconcileState> {
        self.state.subscribe()
    }

    /// The ranked list processed by the latest cycle.
    pub fn last_seen(&self) -> Option<RankedIds> {
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The category's current view.
    pub fn snapshot(&self) -> Arc<PaginatedView> {
        self.views.snapshot(self.category)
    }

    /// Run one full cycle for a new ranked list.
    pub async fn reconcile(&self, new_ids: RankedIds) -> CycleReport {
        self.set_state(ReconcileState::Diffing);
        let to_fetch = {
            let last_seen = self
                .last_seen
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            diff(&new_ids, last_seen.as_deref())
        };
        debug!(category = %self.category, listed = new_ids.len(), new = to_fetch.len(), "Diffed ranked list");

        self.set_state(ReconcileState::Fetching);
        let fetch = self.fetcher.fetch_many(&to_fetch).await;

        self.set_state(ReconcileState::Rebuilding);
        *self
            .last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(new_ids.clone());

        let rebuilt = match self.store.multi_get(&new_ids).await {
            Ok(slots) => {
                let items: Vec<Item> = slots.into_iter().flatten().collect();
                let view = PaginatedView::build(items, self.views.page_size());
                self.views.replace(self.category, view);
                true
            }
            Err(e) => {
                let e = SyncError::from(e);
                warn!(category = %self.category, error = %e, "Rebuild failed, keeping previous view");
                false
            }
        };

        self.set_state(ReconcileState::Idle);

        let report = CycleReport {
            category: self.category,
            listed: new_ids.len(),
            new_ids: to_fetch.len(),
            total_count: self.snapshot().total_count(),
            fetch,
            rebuilt,
        };

        info!(
            category = %self.category,
            listed = report.listed,
            new_ids = report.new_ids,
            fetched = report.fetch.fetched,
            dead_letters = report.fetch.dead_letters.len(),
            rebuilt = report.rebuilt,
            total = report.total_count,
            "Reconcile cycle complete"
        );

        report
    }

    /// Process subscription events until shutdown or the subscription ends.
    ///
    /// Shutdown is only observed between cycles.
    pub async fn run(&self, mut subscription: Subscription, shutdown: CancellationToken) {
        info!(category = %self.category, "Reconciler started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = subscription.next() => match event {
                    Some(RemoteEvent::Value(value)) => {
                        let ids = ranked_ids(self.category, &value);
                        self.reconcile(ids).await;
                    }
                    Some(RemoteEvent::Error(e)) => {
                        warn!(category = %self.category, error = %e, "Ranked list subscription error");
                    }
                    None => {
                        warn!(category = %self.category, "Ranked list subscription closed");
                        break;
                    }
                },
            }
        }

        info!(category = %self.category, "Reconciler stopped");
    }

    fn set_state(&self, state: ReconcileState) {
        self.state.send_replace(state);
    }
}

/// Decode a ranked list value; anything but an array is an empty list.
fn ranked_ids(category: Category, value: &Value) -> RankedIds {
    match value {
        Value::Array(_) => parse_ranked_ids(value),
        Value::Null => Vec::new(),
        other => {
            let e = SyncError::MalformedRankedList(format!("{} is not an array", other));
            warn!(category = %category, error = %e, "Treating ranked list as empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetcherConfig;
    use hn_remote::{MockRemote, RemotePath};
    use hn_search::MemoryItemStore;
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        remote: Arc<MockRemote>,
        store: Arc<MemoryItemStore>,
        views: Arc<ViewCache>,
        reconciler: Arc<ChangeReconciler>,
    }

    fn harness(page_size: usize) -> Harness {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryItemStore::new());
        let views = Arc::new(ViewCache::new(page_size));
        let config = FetcherConfig::default()
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
            .with_max_attempts(1);
        let fetcher = Arc::new(Fetcher::new(remote.clone(), store.clone(), config));
        let reconciler = Arc::new(ChangeReconciler::new(
            Category::Top,
            fetcher,
            store.clone(),
            views.clone(),
        ));
        Harness {
            remote,
            store,
            views,
            reconciler,
        }
    }

    fn seed(remote: &MockRemote, ids: &[u64]) {
        for id in ids {
            remote.set(RemotePath::Item(*id), json!({"id": id, "type": "story"}));
        }
    }

    #[tokio::test]
    async fn test_first_cycle_fetches_everything() {
        let h = harness(2);
        seed(&h.remote, &[1, 2, 3]);

        let report = h.reconciler.reconcile(vec![1, 2, 3]).await;
        assert_eq!(report.new_ids, 3);
        assert_eq!(report.fetch.fetched, 3);
        assert!(report.rebuilt);

        let page = h.views.get_page(Category::Top, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_count, 3);
        assert_eq!(h.reconciler.last_seen(), Some(vec![1, 2, 3]));
        assert_eq!(h.reconciler.state(), ReconcileState::Idle);
    }

    #[tokio::test]
    async fn test_missing_items_are_dropped_from_view() {
        let h = harness(30);
        seed(&h.remote, &[1, 3]);

        let report = h.reconciler.reconcile(vec![1, 2, 3]).await;
        assert_eq!(report.fetch.missing, 1);
        let ids: Vec<u64> = h.reconciler.snapshot().items().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_multi_get_failure_keeps_previous_view() {
        let h = harness(30);
        seed(&h.remote, &[1, 2, 3, 4]);
        h.reconciler.reconcile(vec![1, 2, 3]).await;
        let before = h.reconciler.snapshot();

        h.store.set_fail_multi_get(true);
        let report = h.reconciler.reconcile(vec![4, 1, 2, 3]).await;

        assert!(!report.rebuilt);
        assert_eq!(report.total_count, 3);
        assert!(Arc::ptr_eq(&before, &h.reconciler.snapshot()));
        assert_eq!(h.reconciler.last_seen(), Some(vec![4, 1, 2, 3]));
    }

    #[tokio::test]
    async fn test_malformed_value_is_empty_list() {
        assert!(ranked_ids(Category::Job, &json!({"0": 1})).is_empty());
        assert!(ranked_ids(Category::Job, &Value::Null).is_empty());
        assert_eq!(ranked_ids(Category::Job, &json!([5, 6])), vec![5, 6]);
    }

    #[tokio::test]
    async fn test_run_processes_events_in_order_until_shutdown() {
        let h = harness(30);
        seed(&h.remote, &[1, 2, 3, 4]);

        let (tx, subscription) = Subscription::channel(8);
        let shutdown = CancellationToken::new();
        let mut states = h.reconciler.watch_state();

        let reconciler = h.reconciler.clone();
        let token = shutdown.clone();
        let task = tokio::spawn(async move { reconciler.run(subscription, token).await });

        tx.send(RemoteEvent::Value(json!([1, 2]))).await.unwrap();
        tx.send(RemoteEvent::Error(hn_remote::RemoteError::Timeout)).await.unwrap();
        tx.send(RemoteEvent::Value(json!([3, 1, 2, 4]))).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if h.reconciler.last_seen() == Some(vec![3, 1, 2, 4])
                    && h.reconciler.state() == ReconcileState::Idle
                {
                    break;
                }
                let _ = states.changed().await;
            }
        })
        .await
        .unwrap();

        shutdown.cancel();
        task.await.unwrap();

        let ids: Vec<u64> = h.reconciler.snapshot().items().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1, 2, 4]);
        assert_eq!(h.remote.read_count(&RemotePath::Item(1)), 1);
    }
}
