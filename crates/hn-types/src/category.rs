//! Ranked categories.
//!
//! Hacker News publishes five ranked id-lists. Each one is mirrored into its
//! own paginated view that cannot be rebuilt from the search index alone.

use serde::{Deserialize, Serialize};

use crate::error::HnError;

/// One of the five fixed ranked lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Top,
    New,
    Ask,
    Show,
    Job,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 5] = [
        Category::Top,
        Category::New,
        Category::Ask,
        Category::Show,
        Category::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Top => "top",
            Category::New => "new",
            Category::Ask => "ask",
            Category::Show => "show",
            Category::Job => "job",
        }
    }

    /// Key of the ranked id-list in the remote tree.
    pub fn remote_key(&self) -> &'static str {
        match self {
            Category::Top => "topstories",
            Category::New => "newstories",
            Category::Ask => "askstories",
            Category::Show => "showstories",
            Category::Job => "jobstories",
        }
    }

    /// Parse from string, returning None for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "top" => Some(Category::Top),
            "new" => Some(Category::New),
            "ask" => Some(Category::Ask),
            "show" => Some(Category::Show),
            "job" => Some(Category::Job),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = HnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| HnError::InvalidInput(format!("unknown category: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Top.as_str(), "top");
        assert_eq!(Category::Job.remote_key(), "jobstories");
        assert_eq!(Category::parse("show"), Some(Category::Show));
        assert_eq!(Category::parse("best"), None);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("ask".parse::<Category>().unwrap(), Category::Ask);
        assert!("jobs".parse::<Category>().is_err());
    }

    #[test]
    fn test_all_categories_are_distinct() {
        let mut keys: Vec<_> = Category::ALL.iter().map(|c| c.remote_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 5);
    }
}
