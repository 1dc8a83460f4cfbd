//! Read side of the item index.
//!
//! Point lookups go through the `doc_key` term; list queries combine a
//! kind filter, an optional type filter and a lenient keyword query, then
//! sort by a fast field.

use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{DocAddress, IndexReader, Order, Searcher, TantivyDocument, Term};
use tracing::debug;

use hn_types::{Item, User};

use crate::document::{doc_to_item, doc_to_user};
use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::query::{ItemQuery, QueryPage, SortOrder};
use crate::schema::{DocKind, ItemSchema};

/// Searcher over mirrored items and users.
pub struct ItemSearcher {
    reader: IndexReader,
    schema: ItemSchema,
    query_parser: QueryParser,
}

impl ItemSearcher {
    /// Create a new searcher from a SearchIndex.
    pub fn new(index: &SearchIndex) -> Result<Self, SearchError> {
        let reader = index.reader()?;
        let schema = index.schema().clone();

        let query_parser = QueryParser::for_index(
            index.index(),
            vec![schema.by, schema.title, schema.text],
        );

        Ok(Self {
            reader,
            schema,
            query_parser,
        })
    }

    /// Reload the reader to see recent commits.
    pub fn reload(&self) -> Result<(), SearchError> {
        self.reader.reload()?;
        debug!("Reloaded item reader");
        Ok(())
    }

    /// Look up one item by id.
    pub fn get_item(&self, id: u64) -> Result<Option<Item>, SearchError> {
        let searcher = self.reader.searcher();
        match self.find_by_key(&searcher, &Item::key_for(id))? {
            Some(doc) => Ok(Some(doc_to_item(&self.schema, &doc)?)),
            None => Ok(None),
        }
    }

    /// Look up one user by handle.
    pub fn get_user(&self, handle: &str) -> Result<Option<User>, SearchError> {
        let searcher = self.reader.searcher();
        match self.find_by_key(&searcher, &User::key_for(handle))? {
            Some(doc) => Ok(Some(doc_to_user(&self.schema, &doc)?)),
            None => Ok(None),
        }
    }

    /// Look up many items against a single index snapshot.
    ///
    /// The result has one slot per input id, in input order.
    pub fn multi_get(&self, ids: &[u64]) -> Result<Vec<Option<Item>>, SearchError> {
        let searcher = self.reader.searcher();
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let item = match self.find_by_key(&searcher, &Item::key_for(*id))? {
                Some(doc) => Some(doc_to_item(&self.schema, &doc)?),
                None => None,
            };
            results.push(item);
        }

        debug!(
            requested = ids.len(),
            found = results.iter().flatten().count(),
            "Multi-get"
        );
        Ok(results)
    }

    /// Run a filtered, sorted, paginated query over items.
    pub fn query(&self, query: &ItemQuery) -> Result<QueryPage, SearchError> {
        let searcher = self.reader.searcher();
        let tantivy_query = self.build_query(query);

        let limit = query.page_size.max(1);
        let offset = query.offset();

        let (field, order) = match query.sort {
            SortOrder::Newest => ("time", Order::Desc),
            SortOrder::Oldest => ("time", Order::Asc),
            SortOrder::Score => ("score", Order::Desc),
        };
        let (total, addresses) =
            self.sorted_page(&searcher, tantivy_query.as_ref(), field, order, limit, offset)?;

        let mut hits = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            hits.push(doc_to_item(&self.schema, &doc)?);
        }

        debug!(
            text = ?query.text,
            item_type = ?query.item_type,
            sort = query.sort.as_str(),
            page = query.page,
            total,
            returned = hits.len(),
            "Item query complete"
        );

        Ok(QueryPage { hits, total })
    }

    /// Smallest item id present in the index.
    pub fn lowest_item_id(&self) -> Result<Option<u64>, SearchError> {
        let searcher = self.reader.searcher();
        let collector = TopDocs::with_limit(1).order_by_fast_field::<u64>("item_id", Order::Asc);
        let kind_query = self.kind_query(DocKind::Item);
        let top = searcher.search(kind_query.as_ref(), &collector)?;
        Ok(top.first().map(|(id, _)| *id))
    }

    /// Number of live documents (items and users).
    pub fn num_docs(&self) -> u64 {
        let searcher = self.reader.searcher();
        searcher
            .segment_readers()
            .iter()
            .map(|r| r.num_docs() as u64)
            .sum()
    }

    fn find_by_key(
        &self,
        searcher: &Searcher,
        key: &str,
    ) -> Result<Option<TantivyDocument>, SearchError> {
        let term = Term::from_field_text(self.schema.doc_key, key);
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;

        match top.first() {
            Some((_, address)) => Ok(Some(searcher.doc(*address)?)),
            None => Ok(None),
        }
    }

    fn kind_query(&self, kind: DocKind) -> Box<dyn Query> {
        let term = Term::from_field_text(self.schema.kind, kind.as_str());
        Box::new(TermQuery::new(term, IndexRecordOption::Basic))
    }

    fn build_query(&self, query: &ItemQuery) -> Box<dyn Query> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> =
            vec![(Occur::Must, self.kind_query(DocKind::Item))];

        if let Some(item_type) = &query.item_type {
            let term = Term::from_field_text(self.schema.item_type, item_type);
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }

        if let Some(text) = &query.text {
            let (text_query, errors) = self.query_parser.parse_query_lenient(text);
            if !errors.is_empty() {
                debug!(text = %text, errors = errors.len(), "Lenient parse dropped query parts");
            }
            clauses.push((Occur::Must, text_query));
        }

        Box::new(BooleanQuery::new(clauses))
    }

    /// Count the matches, then collect only the slice of them that exists.
    /// Pages past the end never build a collector.
    fn sorted_page(
        &self,
        searcher: &Searcher,
        query: &dyn Query,
        field: &str,
        order: Order,
        limit: usize,
        offset: usize,
    ) -> Result<(usize, Vec<DocAddress>), SearchError> {
        let total = searcher.search(query, &Count)?;
        if offset >= total {
            return Ok((total, Vec::new()));
        }

        let collector = TopDocs::with_limit(limit.min(total - offset))
            .and_offset(offset)
            .order_by_fast_field::<i64>(field, order);
        let top = searcher.search(query, &collector)?;
        Ok((total, top.into_iter().map(|(_, address)| address).collect()))
    }
}
