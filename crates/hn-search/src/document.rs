//! Document mapping from domain types to Tantivy documents.

use tantivy::doc;
use tantivy::schema::Value;
use tantivy::TantivyDocument;

use hn_types::{Item, User};

use crate::error::SearchError;
use crate::schema::{DocKind, ItemSchema};

/// Convert an Item to a Tantivy document.
///
/// Missing `time` and `score` are indexed as 0 so every item has a value
/// in the sort columns.
pub fn item_to_doc(schema: &ItemSchema, item: &Item) -> Result<TantivyDocument, SearchError> {
    let source = serde_json::to_string(item)?;

    Ok(doc!(
        schema.doc_key => item.doc_key(),
        schema.kind => DocKind::Item.as_str(),
        schema.item_id => item.id,
        schema.item_type => item.item_type.clone(),
        schema.by => item.by.clone().unwrap_or_default(),
        schema.title => item.title.clone().unwrap_or_default(),
        schema.text => item.text.clone().unwrap_or_default(),
        schema.time => item.time.unwrap_or(0),
        schema.score => item.score.unwrap_or(0),
        schema.source => source
    ))
}

/// Convert a User to a Tantivy document.
pub fn user_to_doc(schema: &ItemSchema, user: &User) -> Result<TantivyDocument, SearchError> {
    let source = serde_json::to_string(user)?;

    Ok(doc!(
        schema.doc_key => user.doc_key(),
        schema.kind => DocKind::User.as_str(),
        schema.by => user.id.clone(),
        schema.text => user.about.clone().unwrap_or_default(),
        schema.time => user.created,
        schema.score => user.karma,
        schema.source => source
    ))
}

/// Decode the stored upstream JSON of an item document.
pub fn doc_to_item(schema: &ItemSchema, doc: &TantivyDocument) -> Result<Item, SearchError> {
    let source = stored_source(schema, doc)?;
    Ok(serde_json::from_str(source)?)
}

/// Decode the stored upstream JSON of a user document.
pub fn doc_to_user(schema: &ItemSchema, doc: &TantivyDocument) -> Result<User, SearchError> {
    let source = stored_source(schema, doc)?;
    Ok(serde_json::from_str(source)?)
}

fn stored_source<'a>(schema: &ItemSchema, doc: &'a TantivyDocument) -> Result<&'a str, SearchError> {
    doc.get_first(schema.source)
        .and_then(|v| v.as_str())
        .ok_or_else(|| SearchError::SchemaMismatch("document has no stored source".into()))
}
