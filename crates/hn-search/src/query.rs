//! Query description for the search path.
//!
//! An `ItemQuery` is what `listItems` becomes when the caller does not ask
//! for one of the ranked categories: optional free text over `by`, `title`
//! and `text`, an optional exact type filter, a sort order and a page.

use serde::{Deserialize, Serialize};

use hn_types::Item;

/// Type filter applied when the caller does not name one.
pub const DEFAULT_ITEM_TYPE: &str = "story";

/// Items per page when the caller does not name a page size.
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Creation time, most recent first
    #[default]
    Newest,
    /// Creation time, oldest first
    Oldest,
    /// Points, highest first
    Score,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Score => "score",
        }
    }

    /// Parse from string, returning None for unknown orders.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" | "time" => Some(SortOrder::Newest),
            "oldest" => Some(SortOrder::Oldest),
            "score" | "points" => Some(SortOrder::Score),
            _ => None,
        }
    }
}

/// A single page request against the item store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    /// Free text matched against author, title and body
    pub text: Option<String>,
    /// Exact type tag; None matches every item type
    pub item_type: Option<String>,
    pub sort: SortOrder,
    /// 1-based page number
    pub page: u32,
    pub page_size: usize,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            text: None,
            item_type: Some(DEFAULT_ITEM_TYPE.to_string()),
            sort: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search text. Blank text means no text constraint.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    /// Match items of every type.
    pub fn any_type(mut self) -> Self {
        self.item_type = None;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Set the page; 0 is treated as 1.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of hits skipped before this page.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1).saturating_mul(self.page_size)
    }

    /// Evaluate the filter part of the query against one item.
    ///
    /// Text matching is a case-insensitive containment test of every query
    /// word against author, title and body. The Tantivy store tokenizes
    /// instead, so results can differ for punctuation-heavy input.
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(item_type) = &self.item_type {
            if &item.item_type != item_type {
                return false;
            }
        }

        let Some(text) = &self.text else {
            return true;
        };

        let haystack = [item.by.as_deref(), item.title.as_deref(), item.text.as_deref()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        text.split_whitespace()
            .any(|word| haystack.contains(&word.to_lowercase()))
    }
}

/// One page of query hits plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub hits: Vec<Item>,
    pub total: usize,
}
