//! In-memory item store.
//!
//! Writes are visible immediately and `commit` is a counter bump. Failure
//! switches let tests drive the error paths of the sync engine.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use hn_types::{Item, User};

use crate::error::SearchError;
use crate::query::{ItemQuery, QueryPage, SortOrder};
use crate::store::ItemStore;

/// HashMap-backed [`ItemStore`].
#[derive(Default)]
pub struct MemoryItemStore {
    items: Mutex<HashMap<u64, Item>>,
    users: Mutex<HashMap<String, User>>,
    fail_multi_get: AtomicBool,
    fail_upserts: AtomicBool,
    fail_queries: AtomicBool,
    upserts: AtomicUsize,
    commits: AtomicUsize,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given items already present.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.items.lock() {
            map.extend(items.into_iter().map(|item| (item.id, item)));
        }
        store
    }

    /// Make every subsequent multi_get fail.
    pub fn set_fail_multi_get(&self, fail: bool) {
        self.fail_multi_get.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent upsert fail.
    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent query fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Successful item and user upserts so far.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn check_upsert(&self) -> Result<(), SearchError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable("upserts disabled".into()));
        }
        Ok(())
    }

    fn lock_items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u64, Item>>, SearchError> {
        self.items
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))
    }

    fn lock_users(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, User>>, SearchError> {
        self.users
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn upsert_item(&self, item: &Item) -> Result<(), SearchError> {
        self.check_upsert()?;
        self.lock_items()?.insert(item.id, item.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), SearchError> {
        self.check_upsert()?;
        self.lock_users()?.insert(user.id.clone(), user.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_item(&self, id: u64) -> Result<Option<Item>, SearchError> {
        Ok(self.lock_items()?.get(&id).cloned())
    }

    async fn get_user(&self, handle: &str) -> Result<Option<User>, SearchError> {
        Ok(self.lock_users()?.get(handle).cloned())
    }

    async fn multi_get(&self, ids: &[u64]) -> Result<Vec<Option<Item>>, SearchError> {
        if self.fail_multi_get.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable("multi_get disabled".into()));
        }
        let items = self.lock_items()?;
        Ok(ids.iter().map(|id| items.get(id).cloned()).collect())
    }

    async fn query(&self, query: &ItemQuery) -> Result<QueryPage, SearchError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable("queries disabled".into()));
        }
        let items = self.lock_items()?;
        let mut matched: Vec<&Item> = items
            .values()
            .filter(|item| query.matches(item))
            .collect();

        match query.sort {
            SortOrder::Newest => {
                matched.sort_by_key(|i| (Reverse(i.time.unwrap_or(0)), i.id))
            }
            SortOrder::Oldest => matched.sort_by_key(|i| (i.time.unwrap_or(0), i.id)),
            SortOrder::Score => {
                matched.sort_by_key(|i| (Reverse(i.score.unwrap_or(0)), i.id))
            }
        }

        let total = matched.len();
        let hits = matched
            .into_iter()
            .skip(query.offset())
            .take(query.page_size)
            .cloned()
            .collect();

        Ok(QueryPage { hits, total })
    }

    async fn lowest_item_id(&self) -> Result<Option<u64>, SearchError> {
        Ok(self.lock_items()?.keys().min().copied())
    }

    async fn commit(&self) -> Result<(), SearchError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
