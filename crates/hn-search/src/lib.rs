//! # hn-search
//!
//! Local item store for hn-mirror using Tantivy.
//!
//! Items and users fetched from the remote tree are upserted into an
//! embedded Tantivy index. The index keeps the full upstream document so
//! point lookups and multi-gets return exactly what was last fetched, and
//! indexes `by`, `title` and `text` for keyword search.
//!
//! ## Features
//! - Embedded Tantivy index with MmapDirectory for persistence
//! - Idempotent upsert keyed by `item:{id}` / `user:{handle}`
//! - Ordered multi-get with `None` placeholders for missing ids
//! - Typed query builder: text, type filter, sort order, page
//! - In-memory store with failure injection for tests

pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod memory;
pub mod query;
pub mod schema;
pub mod searcher;
pub mod store;

pub use error::SearchError;
pub use index::{open_or_create_index, SearchIndex, SearchIndexConfig};
pub use indexer::ItemIndexer;
pub use memory::MemoryItemStore;
pub use query::{ItemQuery, QueryPage, SortOrder};
pub use schema::{build_item_schema, DocKind, ItemSchema};
pub use searcher::ItemSearcher;
pub use store::{ItemStore, TantivyItemStore};
