//! End-to-end: Firebase over HTTP into the on-disk index and the views.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hn_daemon::{open_store, run_fetch};
use hn_remote::{FirebaseClient, FirebaseConfig};
use hn_search::ItemStore;
use hn_service::{ListRequest, QueryService};
use hn_sync::SyncEngine;
use hn_types::{Category, Settings};

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn hn_server() -> MockServer {
    let server = MockServer::start().await;
    mount_json(&server, "/v0/topstories.json", json!([2, 1])).await;
    mount_json(
        &server,
        "/v0/item/1.json",
        json!({"id": 1, "type": "story", "title": "Rust 2.0 announced", "by": "alice", "time": 100, "score": 3}),
    )
    .await;
    mount_json(
        &server,
        "/v0/item/2.json",
        json!({"id": 2, "type": "story", "title": "Tantivy internals", "by": "bob", "time": 200, "score": 40}),
    )
    .await;

    // Every other node is absent
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .with_priority(10)
        .mount(&server)
        .await;

    server
}

fn settings_for(dir: &TempDir, server: &MockServer) -> Settings {
    let mut settings = Settings {
        index_path: dir.path().join("index").to_string_lossy().into_owned(),
        ..Default::default()
    };
    settings.remote.base_url = format!("{}/v0", server.uri());
    settings.backfill.enabled = false;
    settings
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_mirrors_top_stories_into_index_and_view() {
    let server = hn_server().await;
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, &server);

    let store = open_store(&settings).unwrap();
    let remote = Arc::new(FirebaseClient::new(FirebaseConfig::from(&settings.remote)).unwrap());
    let mut engine = SyncEngine::new(remote, store.clone(), &settings);
    engine.start();

    let views = engine.views();
    tokio::time::timeout(Duration::from_secs(10), async {
        while views.get_page(Category::Top, 1).total_count < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("top view never materialized");

    let service = QueryService::new(store.clone(), views);

    let top = service.list_items(&ListRequest::special(Category::Top)).await;
    let ids: Vec<u64> = top.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![2, 1]);

    let search = service.list_items(&ListRequest::search("rust")).await;
    let ids: Vec<u64> = search.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1]);

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_command_stores_items_and_counts_missing() {
    let server = hn_server().await;
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, &server);

    let report = run_fetch(&settings, &[1, 2, 99]).await.unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.missing, 1);
    assert!(report.dead_letters.is_empty());

    let store = open_store(&settings).unwrap();
    let item = store.get_item(2).await.unwrap().unwrap();
    assert_eq!(item.title.as_deref(), Some("Tantivy internals"));
    assert!(store.get_item(99).await.unwrap().is_none());
}
