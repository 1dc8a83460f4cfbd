//! Item indexer for writing documents to the Tantivy index.
//!
//! The indexer wraps IndexWriter with shared access via Arc<Mutex>.
//! Documents are not visible until commit() is called.

use std::sync::{Arc, Mutex};

use tantivy::{IndexWriter, Term};
use tracing::debug;

use hn_types::{Item, User};

use crate::document::{item_to_doc, user_to_doc};
use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::schema::ItemSchema;

/// Manages document write operations.
///
/// Every write replaces the document with the same key, so indexing the
/// same item twice leaves a single document holding the latest content.
pub struct ItemIndexer {
    writer: Arc<Mutex<IndexWriter>>,
    schema: ItemSchema,
}

impl ItemIndexer {
    /// Create a new indexer from a SearchIndex.
    pub fn new(index: &SearchIndex) -> Result<Self, SearchError> {
        let writer = index.writer()?;
        let schema = index.schema().clone();

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            schema,
        })
    }

    /// Index an item, replacing any previous version.
    pub fn index_item(&self, item: &Item) -> Result<(), SearchError> {
        let doc = item_to_doc(&self.schema, item)?;
        let key = item.doc_key();

        let writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        writer.delete_term(Term::from_field_text(self.schema.doc_key, &key));
        writer.add_document(doc)?;

        debug!(item_id = item.id, item_type = %item.item_type, "Indexed item");
        Ok(())
    }

    /// Index a user, replacing any previous version.
    pub fn index_user(&self, user: &User) -> Result<(), SearchError> {
        let doc = user_to_doc(&self.schema, user)?;
        let key = user.doc_key();

        let writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        writer.delete_term(Term::from_field_text(self.schema.doc_key, &key));
        writer.add_document(doc)?;

        debug!(user = %user.id, "Indexed user");
        Ok(())
    }

    /// Commit pending changes to make them searchable.
    ///
    /// This is expensive - batch writes and commit once per batch.
    pub fn commit(&self) -> Result<u64, SearchError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        let opstamp = writer.commit()?;
        debug!(opstamp, "Committed index changes");
        Ok(opstamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SearchIndexConfig;
    use tempfile::TempDir;

    fn num_docs(index: &SearchIndex) -> u64 {
        let reader = index.reader().unwrap();
        reader
            .searcher()
            .segment_readers()
            .iter()
            .map(|r| r.num_docs() as u64)
            .sum()
    }

    #[test]
    fn test_reindexing_replaces_document() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open_or_create(SearchIndexConfig::new(temp_dir.path())).unwrap();
        let indexer = ItemIndexer::new(&index).unwrap();

        indexer
            .index_item(&Item::new(1, "story").with_title("Version 1"))
            .unwrap();
        indexer.commit().unwrap();

        indexer
            .index_item(&Item::new(1, "story").with_title("Version 2"))
            .unwrap();
        indexer.commit().unwrap();

        assert_eq!(num_docs(&index), 1);
    }

    #[test]
    fn test_items_and_users_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open_or_create(SearchIndexConfig::new(temp_dir.path())).unwrap();
        let indexer = ItemIndexer::new(&index).unwrap();

        indexer.index_item(&Item::new(123, "comment")).unwrap();
        indexer.index_user(&User::new("123")).unwrap();
        indexer.commit().unwrap();

        assert_eq!(num_docs(&index), 2);
    }
}
