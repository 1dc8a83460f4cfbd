//! Item type mirrored from the remote tree.
//!
//! Items are replaced wholesale on every re-fetch. Attributes this crate
//! does not model explicitly are kept in `extra` so a stored item always
//! matches what upstream last returned.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A story, comment, job, poll or poll option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Upstream identifier (positive, monotonically assigned)
    pub id: u64,

    /// Opaque type tag from upstream ("story", "comment", "job", ...)
    #[serde(rename = "type", default)]
    pub item_type: String,

    /// Author handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,

    /// Creation time, Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTML body for comments, Ask HN and jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,

    /// Total comment count for stories and polls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descendants: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,

    /// Poll owning this poll option
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<u64>,

    /// Child comment ids, in ranked display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kids: Vec<u64>,

    /// Poll option ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<u64>,

    /// Upstream marked this item deleted
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,

    /// Upstream marked this item dead
    #[serde(default, skip_serializing_if = "is_false")]
    pub dead: bool,

    /// Attributes not modelled above, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Item {
    /// Create a bare item with only id and type set.
    pub fn new(id: u64, item_type: impl Into<String>) -> Self {
        Self {
            id,
            item_type: item_type.into(),
            by: None,
            time: None,
            title: None,
            text: None,
            url: None,
            score: None,
            descendants: None,
            parent: None,
            poll: None,
            kids: Vec::new(),
            parts: Vec::new(),
            deleted: false,
            dead: false,
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_by(mut self, by: impl Into<String>) -> Self {
        self.by = Some(by.into());
        self
    }

    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Some(score);
        self
    }

    /// Key under which this item is stored in the local index.
    pub fn doc_key(&self) -> String {
        Self::key_for(self.id)
    }

    pub fn key_for(id: u64) -> String {
        format!("item:{}", id)
    }

    /// Decode a value read from the remote tree.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// An ordered ranked id-list as published upstream.
pub type RankedIds = Vec<u64>;

/// Parse a ranked id-list.
///
/// A value that is not an array is treated as an empty list. Entries that
/// are not unsigned integers are skipped.
pub fn parse_ranked_ids(value: &Value) -> RankedIds {
    match value {
        Value::Array(entries) => entries.iter().filter_map(Value::as_u64).collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(kind = value_kind(other), "Ranked list is not an array, treating as empty");
            Vec::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
