//! User profiles mirrored from the remote tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Hacker News user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Case-sensitive handle
    pub id: String,

    /// Creation time, Unix seconds
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub karma: i64,

    /// Self-description, HTML
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,

    /// Ids of the user's stories, polls and comments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submitted: Vec<u64>,

    /// Attributes not modelled above, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created: 0,
            karma: 0,
            about: None,
            submitted: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Key under which this user is stored in the local index.
    pub fn doc_key(&self) -> String {
        Self::key_for(&self.id)
    }

    pub fn key_for(handle: &str) -> String {
        format!("user:{}", handle)
    }

    /// Decode a value read from the remote tree.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_user() {
        let value = json!({
            "about": "This is a test",
            "created": 1173923446,
            "id": "jl",
            "karma": 2937,
            "submitted": [8265435, 8168423]
        });

        let user = User::from_value(value).unwrap();
        assert_eq!(user.id, "jl");
        assert_eq!(user.karma, 2937);
        assert_eq!(user.submitted.len(), 2);
        assert_eq!(user.doc_key(), "user:jl");
    }

    #[test]
    fn test_missing_id_is_an_error() {
        assert!(User::from_value(json!({"karma": 1})).is_err());
    }
}
