//! Query path for hn-mirror.
//!
//! [`QueryService::list_items`] answers both kinds of list request:
//! - ranked category pages, served from the sync engine's views
//! - keyword search over the local item store, filtered by type and sorted
//!
//! It never fails; store errors degrade to an empty page.

pub mod query;

pub use query::{ListRequest, ListResponse, QueryService};
