//! End-to-end sync scenarios against an in-process remote.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use hn_remote::{MockRemote, RemotePath};
use hn_search::{ItemStore, MemoryItemStore, SearchIndexConfig, TantivyItemStore};
use hn_sync::{ChangeReconciler, Fetcher, FetcherConfig, UpdateLogConsumer, ViewCache};
use hn_types::{Category, UpdateLog};

fn fetcher_config() -> FetcherConfig {
    FetcherConfig::default()
        .with_backoff(Duration::from_millis(1), Duration::from_millis(5))
        .with_max_attempts(2)
}

fn story(id: u64, title: &str) -> serde_json::Value {
    json!({"id": id, "type": "story", "title": title, "by": "alice", "time": 1_700_000_000 + id})
}

fn ids_on_page(views: &ViewCache, category: Category, page: u32) -> Vec<u64> {
    views
        .get_page(category, page)
        .items
        .iter()
        .map(|item| item.id)
        .collect()
}

struct Mirror {
    remote: Arc<MockRemote>,
    store: Arc<dyn ItemStore>,
    views: Arc<ViewCache>,
    fetcher: Arc<Fetcher>,
}

impl Mirror {
    fn new(store: Arc<dyn ItemStore>, page_size: usize) -> Self {
        let remote = Arc::new(MockRemote::new());
        let views = Arc::new(ViewCache::new(page_size));
        let fetcher = Arc::new(Fetcher::new(remote.clone(), store.clone(), fetcher_config()));
        Self {
            remote,
            store,
            views,
            fetcher,
        }
    }

    fn reconciler(&self, category: Category) -> ChangeReconciler {
        ChangeReconciler::new(
            category,
            self.fetcher.clone(),
            self.store.clone(),
            self.views.clone(),
        )
    }
}

#[tokio::test]
async fn three_items_page_size_two() {
    let mirror = Mirror::new(Arc::new(MemoryItemStore::new()), 2);
    for id in 1..=3 {
        mirror
            .remote
            .set(RemotePath::Item(id), story(id, &format!("Story {}", id)));
    }

    let reconciler = mirror.reconciler(Category::Top);
    reconciler.reconcile(vec![1, 2, 3]).await;

    assert_eq!(ids_on_page(&mirror.views, Category::Top, 1), vec![1, 2]);
    assert_eq!(ids_on_page(&mirror.views, Category::Top, 2), vec![3]);

    let page = mirror.views.get_page(Category::Top, 1);
    assert_eq!(page.total_count, 3);
    assert_eq!(page.page_count, 2);
}

#[tokio::test]
async fn appended_id_is_the_only_fetch() {
    let mirror = Mirror::new(Arc::new(MemoryItemStore::new()), 30);
    for id in 1..=4 {
        mirror
            .remote
            .set(RemotePath::Item(id), story(id, &format!("Story {}", id)));
    }

    let reconciler = mirror.reconciler(Category::New);
    reconciler.reconcile(vec![1, 2, 3]).await;
    assert_eq!(mirror.remote.item_reads(), 3);

    let report = reconciler.reconcile(vec![1, 2, 3, 4]).await;
    assert_eq!(report.new_ids, 1);
    assert_eq!(mirror.remote.item_reads(), 4);
    assert_eq!(mirror.remote.read_count(&RemotePath::Item(4)), 1);
    assert_eq!(mirror.remote.read_count(&RemotePath::Item(1)), 1);
    assert_eq!(ids_on_page(&mirror.views, Category::New, 1), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn update_log_replaces_item_in_tantivy_store() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(TantivyItemStore::open(SearchIndexConfig::new(dir.path())).unwrap());
    let mirror = Mirror::new(store.clone(), 30);

    mirror.remote.set(
        RemotePath::Item(7),
        json!({"id": 7, "type": "story", "title": "Before", "text": "draft"}),
    );
    mirror.fetcher.fetch(7).await.unwrap();

    mirror.remote.set(
        RemotePath::Item(7),
        json!({"id": 7, "type": "story", "title": "After", "score": 12}),
    );
    let consumer = UpdateLogConsumer::new(mirror.fetcher.clone(), true);
    consumer
        .apply(&UpdateLog {
            items: vec![7],
            profiles: vec![],
        })
        .await;

    let item = store.get_item(7).await.unwrap().unwrap();
    assert_eq!(item.title.as_deref(), Some("After"));
    assert_eq!(item.text, None);
    assert_eq!(item.score, Some(12));
    assert_eq!(store.num_docs(), 1);
}

#[tokio::test]
async fn failed_rebuild_keeps_last_good_view() {
    let store = Arc::new(MemoryItemStore::new());
    let mirror = Mirror::new(store.clone(), 30);
    for id in 1..=5 {
        mirror
            .remote
            .set(RemotePath::Item(id), story(id, &format!("Story {}", id)));
    }

    let reconciler = mirror.reconciler(Category::Ask);
    reconciler.reconcile(vec![1, 2]).await;

    store.set_fail_multi_get(true);
    reconciler.reconcile(vec![5, 4, 1, 2]).await;
    assert_eq!(ids_on_page(&mirror.views, Category::Ask, 1), vec![1, 2]);

    store.set_fail_multi_get(false);
    reconciler.reconcile(vec![5, 4, 1, 2]).await;
    assert_eq!(ids_on_page(&mirror.views, Category::Ask, 1), vec![5, 4, 1, 2]);
}

#[tokio::test]
async fn dead_lettered_ids_stay_out_of_the_view() {
    let mirror = Mirror::new(Arc::new(MemoryItemStore::new()), 30);
    mirror.remote.set(RemotePath::Item(1), story(1, "Up"));
    mirror.remote.set(RemotePath::Item(2), story(2, "Flaky"));
    mirror.remote.fail_always(RemotePath::Item(2));

    let reconciler = mirror.reconciler(Category::Job);
    let report = reconciler.reconcile(vec![2, 1]).await;

    assert_eq!(report.fetch.dead_letters.len(), 1);
    assert_eq!(mirror.remote.read_count(&RemotePath::Item(2)), 2);
    assert_eq!(ids_on_page(&mirror.views, Category::Job, 1), vec![1]);
}

#[tokio::test]
async fn ranked_views_are_independent_of_search() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(TantivyItemStore::open(SearchIndexConfig::new(dir.path())).unwrap());
    let mirror = Mirror::new(store.clone(), 30);
    for id in 1..=3 {
        mirror
            .remote
            .set(RemotePath::Item(id), story(id, &format!("Story {}", id)));
    }

    mirror.reconciler(Category::Top).reconcile(vec![3, 1, 2]).await;
    mirror.reconciler(Category::Show).reconcile(vec![2]).await;

    assert_eq!(ids_on_page(&mirror.views, Category::Top, 1), vec![3, 1, 2]);
    assert_eq!(ids_on_page(&mirror.views, Category::Show, 1), vec![2]);
}
