//! The item store seam.
//!
//! Everything outside this crate talks to local storage through the
//! [`ItemStore`] trait. [`TantivyItemStore`] is the persistent
//! implementation; [`crate::MemoryItemStore`] backs tests.

use async_trait::async_trait;
use tracing::{debug, info};

use hn_types::{Item, User};

use crate::error::SearchError;
use crate::index::{SearchIndex, SearchIndexConfig};
use crate::indexer::ItemIndexer;
use crate::query::{ItemQuery, QueryPage};
use crate::searcher::ItemSearcher;

/// Local storage of mirrored items and users.
///
/// Upserts fully replace any stored document with the same key. Writes
/// become visible to reads once [`ItemStore::commit`] returns.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn upsert_item(&self, item: &Item) -> Result<(), SearchError>;

    async fn upsert_user(&self, user: &User) -> Result<(), SearchError>;

    async fn get_item(&self, id: u64) -> Result<Option<Item>, SearchError>;

    async fn get_user(&self, handle: &str) -> Result<Option<User>, SearchError>;

    /// One slot per requested id, in request order; `None` where absent.
    async fn multi_get(&self, ids: &[u64]) -> Result<Vec<Option<Item>>, SearchError>;

    async fn query(&self, query: &ItemQuery) -> Result<QueryPage, SearchError>;

    /// Smallest stored item id, used to resume a history walk.
    async fn lowest_item_id(&self) -> Result<Option<u64>, SearchError>;

    /// Make pending upserts visible to reads.
    async fn commit(&self) -> Result<(), SearchError>;
}

/// Item store backed by an on-disk Tantivy index.
pub struct TantivyItemStore {
    index: SearchIndex,
    indexer: ItemIndexer,
    searcher: ItemSearcher,
}

impl TantivyItemStore {
    /// Open or create the index described by `config`.
    pub fn open(config: SearchIndexConfig) -> Result<Self, SearchError> {
        let index = SearchIndex::open_or_create(config)?;
        let indexer = ItemIndexer::new(&index)?;
        let searcher = ItemSearcher::new(&index)?;

        info!(path = ?index.path(), docs = searcher.num_docs(), "Item store ready");

        Ok(Self {
            index,
            indexer,
            searcher,
        })
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Number of stored documents, items and users together.
    pub fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }
}

#[async_trait]
impl ItemStore for TantivyItemStore {
    async fn upsert_item(&self, item: &Item) -> Result<(), SearchError> {
        self.indexer.index_item(item)
    }

    async fn upsert_user(&self, user: &User) -> Result<(), SearchError> {
        self.indexer.index_user(user)
    }

    async fn get_item(&self, id: u64) -> Result<Option<Item>, SearchError> {
        self.searcher.get_item(id)
    }

    async fn get_user(&self, handle: &str) -> Result<Option<User>, SearchError> {
        self.searcher.get_user(handle)
    }

    async fn multi_get(&self, ids: &[u64]) -> Result<Vec<Option<Item>>, SearchError> {
        self.searcher.multi_get(ids)
    }

    async fn query(&self, query: &ItemQuery) -> Result<QueryPage, SearchError> {
        self.searcher.query(query)
    }

    async fn lowest_item_id(&self) -> Result<Option<u64>, SearchError> {
        self.searcher.lowest_item_id()
    }

    async fn commit(&self) -> Result<(), SearchError> {
        let opstamp = self.indexer.commit()?;
        self.searcher.reload()?;
        debug!(opstamp, "Item store commit visible");
        Ok(())
    }
}
