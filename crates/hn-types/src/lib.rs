//! # hn-types
//!
//! Shared domain types for hn-mirror.
//!
//! This crate defines the data structures used throughout the system:
//! - Items: stories, comments, jobs and polls mirrored from Hacker News
//! - Users: profiles named by the update log
//! - Categories: the five ranked id-lists (top, new, ask, show, job)
//! - Update log: the remote feed of changed items and profiles
//! - Settings: layered configuration for the daemon
//!
//! ## Usage
//!
//! ```rust
//! use hn_types::{Category, Item};
//!
//! let item = Item::new(8863, "story");
//! assert_eq!(Category::Top.remote_key(), "topstories");
//! assert_eq!(item.doc_key(), "item:8863");
//! ```

pub mod category;
pub mod config;
pub mod error;
pub mod item;
pub mod update_log;
pub mod user;

pub use category::Category;
pub use config::{BackfillSettings, RemoteSettings, Settings, SyncSettings};
pub use error::HnError;
pub use item::{parse_ranked_ids, Item, RankedIds};
pub use update_log::UpdateLog;
pub use user::User;
