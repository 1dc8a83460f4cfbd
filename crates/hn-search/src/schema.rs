//! Tantivy schema definition for mirrored items and users.
//!
//! Both document kinds share one index:
//! - Items: keyword fields for filtering, `by`/`title`/`text` for search,
//!   `time`/`score`/`item_id` fast fields for sorting
//! - Users: `about` goes into `text`, creation time into `time`
//!
//! Every document also stores its full upstream JSON in `source`.

use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, STRING, TEXT};

use crate::SearchError;

/// Document kinds stored in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Item,
    User,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Item => "item",
            DocKind::User => "user",
        }
    }

    /// Parse from string, returning None for unknown kinds.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "item" => Some(DocKind::Item),
            "user" => Some(DocKind::User),
            _ => None,
        }
    }
}

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct ItemSchema {
    schema: Schema,
    /// Primary key: "item:{id}" or "user:{handle}" (STRING | STORED)
    pub doc_key: Field,
    /// "item" or "user" (STRING)
    pub kind: Field,
    /// Numeric item id, items only (FAST | STORED)
    pub item_id: Field,
    /// Upstream type tag (STRING | STORED)
    pub item_type: Field,
    /// Author handle (TEXT)
    pub by: Field,
    /// Story title (TEXT)
    pub title: Field,
    /// Body text, or a user's about text (TEXT)
    pub text: Field,
    /// Unix seconds (INDEXED | FAST)
    pub time: Field,
    /// Points (FAST)
    pub score: Field,
    /// Full upstream document as JSON (STORED)
    pub source: Field,
}

impl ItemSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create an ItemSchema from an existing Tantivy Schema
    pub fn from_schema(schema: Schema) -> Result<Self, SearchError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SearchError::SchemaMismatch(format!("missing {} field", name)))
        };

        Ok(Self {
            doc_key: field("doc_key")?,
            kind: field("kind")?,
            item_id: field("item_id")?,
            item_type: field("item_type")?,
            by: field("by")?,
            title: field("title")?,
            text: field("text")?,
            time: field("time")?,
            score: field("score")?,
            source: field("source")?,
            schema,
        })
    }
}

/// Build the item schema.
pub fn build_item_schema() -> ItemSchema {
    let mut schema_builder = Schema::builder();

    let doc_key = schema_builder.add_text_field("doc_key", STRING | STORED);
    let kind = schema_builder.add_text_field("kind", STRING);
    let item_id = schema_builder.add_u64_field("item_id", INDEXED | FAST | STORED);
    let item_type = schema_builder.add_text_field("item_type", STRING | STORED);
    let by = schema_builder.add_text_field("by", TEXT);
    let title = schema_builder.add_text_field("title", TEXT);
    let text = schema_builder.add_text_field("text", TEXT);
    let time = schema_builder.add_i64_field("time", INDEXED | FAST);
    let score = schema_builder.add_i64_field("score", FAST);
    let source = schema_builder.add_text_field("source", STORED);

    let schema = schema_builder.build();

    ItemSchema {
        schema,
        doc_key,
        kind,
        item_id,
        item_type,
        by,
        title,
        text,
        time,
        score,
        source,
    }
}
