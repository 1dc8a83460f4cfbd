//! The sync engine: wires every background task together.
//!
//! One task per ranked category, one for the update log and one for the
//! startup backfill. All of them share a cancellation token; shutdown
//! cancels it and waits for each task to finish its current cycle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hn_remote::{RemotePath, RemoteSource};
use hn_search::ItemStore;
use hn_types::{Category, Settings};

use crate::backfill::Backfiller;
use crate::fetcher::{Fetcher, FetcherConfig};
use crate::reconciler::ChangeReconciler;
use crate::update_log::UpdateLogConsumer;
use crate::view::ViewCache;

/// Owns the reconcilers, the update log consumer and the backfill.
pub struct SyncEngine {
    remote: Arc<dyn RemoteSource>,
    views: Arc<ViewCache>,
    fetcher: Arc<Fetcher>,
    reconcilers: HashMap<Category, Arc<ChangeReconciler>>,
    update_log: Arc<UpdateLogConsumer>,
    backfiller: Option<Arc<Backfiller>>,
    shutdown: CancellationToken,
    tasks: JoinSet<()>,
    started: bool,
}

impl SyncEngine {
    /// Build the engine. Nothing runs until [`SyncEngine::start`].
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn ItemStore>,
        settings: &Settings,
    ) -> Self {
        let views = Arc::new(ViewCache::new(settings.sync.page_size));
        let fetcher = Arc::new(Fetcher::new(
            remote.clone(),
            store.clone(),
            FetcherConfig::from_settings(settings),
        ));

        let reconcilers = Category::ALL
            .iter()
            .map(|category| {
                let reconciler = ChangeReconciler::new(
                    *category,
                    fetcher.clone(),
                    store.clone(),
                    views.clone(),
                );
                (*category, Arc::new(reconciler))
            })
            .collect();

        let update_log = Arc::new(UpdateLogConsumer::new(
            fetcher.clone(),
            settings.sync.fetch_users,
        ));

        let backfiller = settings.backfill.enabled.then(|| {
            Arc::new(Backfiller::new(
                remote.clone(),
                store.clone(),
                fetcher.clone(),
                settings.backfill.clone(),
            ))
        });

        Self {
            remote,
            views,
            fetcher,
            reconcilers,
            update_log,
            backfiller,
            shutdown: CancellationToken::new(),
            tasks: JoinSet::new(),
            started: false,
        }
    }

    /// Subscribe to every remote feed and spawn the background tasks.
    ///
    /// Calling this more than once has no effect.
    pub fn start(&mut self) {
        if self.started {
            warn!("Sync engine already started");
            return;
        }
        self.started = true;

        for category in Category::ALL {
            let Some(reconciler) = self.reconcilers.get(&category).cloned() else {
                continue;
            };
            let subscription = self.remote.subscribe(RemotePath::Ranked(category));
            let token = self.shutdown.clone();
            self.tasks
                .spawn(async move { reconciler.run(subscription, token).await });
        }

        let consumer = self.update_log.clone();
        let subscription = self.remote.subscribe(RemotePath::Updates);
        let token = self.shutdown.clone();
        self.tasks
            .spawn(async move { consumer.run(subscription, token).await });

        if let Some(backfiller) = self.backfiller.clone() {
            let token = self.shutdown.clone();
            self.tasks.spawn(async move {
                backfiller.run(token).await;
            });
        }

        info!(tasks = self.tasks.len(), "Sync engine started");
    }

    /// Views shared with the query path.
    pub fn views(&self) -> Arc<ViewCache> {
        self.views.clone()
    }

    pub fn fetcher(&self) -> Arc<Fetcher> {
        self.fetcher.clone()
    }

    pub fn reconciler(&self, category: Category) -> Option<Arc<ChangeReconciler>> {
        self.reconcilers.get(&category).cloned()
    }

    /// Token cancelled when the engine shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.shutdown.is_cancelled()
    }

    /// Stop every task, letting running cycles complete.
    pub async fn shutdown(&mut self) {
        info!("Initiating sync engine shutdown");
        self.shutdown.cancel();

        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }

        info!("Sync engine shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_remote::MockRemote;
    use hn_search::MemoryItemStore;
    use serde_json::json;
    use std::time::Duration;

    fn test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.sync.page_size = 2;
        settings.backfill.enabled = false;
        settings
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_and_shutdown() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryItemStore::new());
        let mut engine = SyncEngine::new(remote, store, &test_settings());

        assert!(!engine.is_running());
        engine.start();
        assert!(engine.is_running());

        let token = engine.shutdown_token();
        engine.shutdown().await;
        assert!(token.is_cancelled());
        assert!(!engine.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_engine_materializes_published_list() {
        let remote = Arc::new(MockRemote::new());
        for id in [1u64, 2, 3] {
            remote.set(RemotePath::Item(id), json!({"id": id, "type": "story"}));
        }
        let store = Arc::new(MemoryItemStore::new());
        let mut engine = SyncEngine::new(remote.clone(), store, &test_settings());
        engine.start();

        remote
            .publish(RemotePath::Ranked(Category::Show), json!([3, 2, 1]))
            .await;

        let views = engine.views();
        tokio::time::timeout(Duration::from_secs(5), async {
            while views.get_page(Category::Show, 1).total_count < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let page = views.get_page(Category::Show, 2);
        assert_eq!(page.items[0].id, 1);
        assert_eq!(views.get_page(Category::Top, 1).total_count, 0);

        engine.shutdown().await;
    }
}
