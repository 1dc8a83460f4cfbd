//! Update log consumption.
//!
//! Upstream publishes the ids of recently changed items and profiles. Each
//! tick re-fetches all of them, whether or not they are already stored, so
//! edits, score changes and new comments replace the local copies.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hn_remote::{RemoteEvent, Subscription};
use hn_types::UpdateLog;

use crate::fetcher::{FetchReport, Fetcher};

/// Outcome of applying one update log tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub items: FetchReport,
    pub users: FetchReport,
}

/// Re-fetches everything the update log names.
pub struct UpdateLogConsumer {
    fetcher: Arc<Fetcher>,
    fetch_users: bool,
}

impl UpdateLogConsumer {
    pub fn new(fetcher: Arc<Fetcher>, fetch_users: bool) -> Self {
        Self {
            fetcher,
            fetch_users,
        }
    }

    /// Apply one tick.
    pub async fn apply(&self, log: &UpdateLog) -> UpdateReport {
        let items = self.fetcher.fetch_many(&log.items).await;

        let users = if self.fetch_users {
            self.fetcher.fetch_users(&log.profiles).await
        } else {
            FetchReport::default()
        };

        info!(
            items = log.items.len(),
            items_fetched = items.fetched,
            profiles = log.profiles.len(),
            users_fetched = users.fetched,
            "Applied update log"
        );

        UpdateReport { items, users }
    }

    /// Apply ticks in arrival order until shutdown or the subscription ends.
    pub async fn run(&self, mut subscription: Subscription, shutdown: CancellationToken) {
        info!("Update log consumer started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = subscription.next() => match event {
                    Some(RemoteEvent::Value(value)) => {
                        let log = UpdateLog::from_value(&value);
                        if log.is_empty() {
                            debug!("Empty update log tick");
                            continue;
                        }
                        self.apply(&log).await;
                    }
                    Some(RemoteEvent::Error(e)) => {
                        warn!(error = %e, "Update log subscription error");
                    }
                    None => {
                        warn!("Update log subscription closed");
                        break;
                    }
                },
            }
        }

        info!("Update log consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetcherConfig;
    use hn_remote::{MockRemote, RemotePath};
    use hn_search::{ItemStore, MemoryItemStore};
    use hn_types::Item;
    use serde_json::json;

    fn setup(fetch_users: bool) -> (Arc<MockRemote>, Arc<MemoryItemStore>, UpdateLogConsumer) {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryItemStore::new());
        let fetcher = Arc::new(Fetcher::new(
            remote.clone(),
            store.clone(),
            FetcherConfig::default(),
        ));
        (remote, store, UpdateLogConsumer::new(fetcher, fetch_users))
    }

    #[tokio::test]
    async fn test_refetches_stored_item() {
        let (remote, store, consumer) = setup(true);
        store
            .upsert_item(&Item::new(7, "story").with_title("Old").with_text("stale body"))
            .await
            .unwrap();
        remote.set(
            RemotePath::Item(7),
            json!({"id": 7, "type": "story", "title": "New", "score": 42}),
        );

        let log = UpdateLog {
            items: vec![7],
            profiles: vec![],
        };
        let report = consumer.apply(&log).await;
        assert_eq!(report.items.fetched, 1);

        let item = store.get_item(7).await.unwrap().unwrap();
        assert_eq!(item.title.as_deref(), Some("New"));
        assert_eq!(item.score, Some(42));
        assert_eq!(item.text, None);
    }

    #[tokio::test]
    async fn test_profiles_respect_setting() {
        let (remote, store, consumer) = setup(false);
        remote.set(RemotePath::User("pg".into()), json!({"id": "pg"}));

        let log = UpdateLog {
            items: vec![],
            profiles: vec!["pg".into()],
        };
        let report = consumer.apply(&log).await;
        assert_eq!(report.users.attempted, 0);
        assert!(store.get_user("pg").await.unwrap().is_none());

        let (remote, store, consumer) = setup(true);
        remote.set(RemotePath::User("pg".into()), json!({"id": "pg"}));
        consumer.apply(&log).await;
        assert!(store.get_user("pg").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (remote, store, consumer) = setup(true);
        remote.set(RemotePath::Item(1), json!({"id": 1, "type": "comment"}));

        let (tx, subscription) = Subscription::channel(4);
        let shutdown = CancellationToken::new();
        let consumer = Arc::new(consumer);
        let task = {
            let consumer = consumer.clone();
            let token = shutdown.clone();
            tokio::spawn(async move { consumer.run(subscription, token).await })
        };

        tx.send(RemoteEvent::Value(json!({"items": [1]}))).await.unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while store.get_item(1).await.unwrap().is_none() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shutdown.cancel();
        task.await.unwrap();
    }
}
