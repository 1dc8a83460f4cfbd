//! The on-disk item index.
//!
//! One directory per mirror. The schema is fixed; an index written with
//! any other schema is refused on open.

use std::path::{Path, PathBuf};

use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};
use tracing::{debug, info};

use crate::error::SearchError;
use crate::schema::{build_item_schema, ItemSchema};

const DEFAULT_WRITER_MEMORY_MB: usize = 50;

/// Tantivy refuses a writer arena smaller than this.
const MIN_WRITER_MEMORY_MB: usize = 15;

const META_FILE: &str = "meta.json";

/// Where the item index lives and how much memory its writer may use.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    pub index_path: PathBuf,
    /// Writer arena in MB, never below 15
    pub writer_memory_mb: usize,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self::new("./hn-index")
    }
}

impl SearchIndexConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb.max(MIN_WRITER_MEMORY_MB);
        self
    }
}

/// The on-disk item index together with its resolved field handles.
pub struct SearchIndex {
    index: Index,
    schema: ItemSchema,
    config: SearchIndexConfig,
}

impl SearchIndex {
    /// Open the item index, creating an empty one on first use.
    ///
    /// Fails with [`SearchError::SchemaMismatch`] when the directory holds an
    /// index that lacks any item field.
    pub fn open_or_create(config: SearchIndexConfig) -> Result<Self, SearchError> {
        let index = open_or_create_index(&config.index_path)?;
        let schema = ItemSchema::from_schema(index.schema())?;
        info!(path = ?config.index_path, "Item index ready");
        Ok(Self {
            index,
            schema,
            config,
        })
    }

    pub fn schema(&self) -> &ItemSchema {
        &self.schema
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// The single writer for this index. A second call while the first
    /// writer is alive fails with a lock error.
    pub fn writer(&self) -> Result<IndexWriter, SearchError> {
        let memory_mb = self.config.writer_memory_mb.max(MIN_WRITER_MEMORY_MB);
        let writer = self.index.writer(memory_mb * 1024 * 1024)?;
        debug!(memory_mb, "Item index writer opened");
        Ok(writer)
    }

    /// Reader that only moves forward when the store reloads it after a
    /// commit, so lookups never see a half-applied batch.
    pub fn reader(&self) -> Result<IndexReader, SearchError> {
        Ok(self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?)
    }

    pub fn path(&self) -> &Path {
        &self.config.index_path
    }

    /// True once Tantivy has written its metadata file.
    pub fn exists(&self) -> bool {
        has_meta(&self.config.index_path)
    }
}

fn has_meta(path: &Path) -> bool {
    path.join(META_FILE).exists()
}

/// Open the item index at `path`, creating the directory and an empty
/// index with the item schema when nothing is there yet.
pub fn open_or_create_index(path: &Path) -> Result<Index, SearchError> {
    if has_meta(path) {
        debug!(path = ?path, "Opening existing index");
        return Ok(Index::open_in_dir(path)?);
    }

    info!(path = ?path, "Creating new index");
    std::fs::create_dir_all(path)?;
    let schema = build_item_schema();
    Ok(Index::create_in_dir(path, schema.schema().clone())?)
}
