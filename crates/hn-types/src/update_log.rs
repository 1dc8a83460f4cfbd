//! The remote update log.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Items and profiles that changed since the previous tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLog {
    #[serde(default)]
    pub items: Vec<u64>,

    #[serde(default)]
    pub profiles: Vec<String>,
}

impl UpdateLog {
    /// Parse leniently: missing or ill-typed fields become empty lists.
    pub fn from_value(value: &Value) -> Self {
        let items = value
            .get("items")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();

        let profiles = value
            .get("profiles")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self { items, profiles }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.profiles.is_empty()
    }
}
