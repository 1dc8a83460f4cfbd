//! Addresses in the remote tree.

use std::fmt;

use hn_types::Category;

/// A readable location in the remote tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemotePath {
    /// `item/{id}`
    Item(u64),
    /// `user/{handle}`
    User(String),
    /// One of the five ranked id-lists
    Ranked(Category),
    /// `updates`, the rolling change log
    Updates,
    /// `maxitem`, the largest assigned item id
    MaxItem,
}

impl RemotePath {
    /// Path relative to the tree root, without extension.
    pub fn path(&self) -> String {
        match self {
            RemotePath::Item(id) => format!("item/{}", id),
            RemotePath::User(handle) => format!("user/{}", handle),
            RemotePath::Ranked(category) => category.remote_key().to_string(),
            RemotePath::Updates => "updates".to_string(),
            RemotePath::MaxItem => "maxitem".to_string(),
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
