//! Sync engine for hn-mirror.
//!
//! Keeps a local item store and five ranked views in step with the
//! Hacker News Firebase tree.
//!
//! ## Key Components
//!
//! - [`Fetcher`]: reads items and users upstream and upserts them locally
//! - [`diff`]: ids new to a ranked list since its previous value
//! - [`ChangeReconciler`]: per-category diff, fetch and rebuild cycle
//! - [`UpdateLogConsumer`]: re-fetches everything the update log names
//! - [`Backfiller`]: walks recent item ids at startup
//! - [`ViewCache`]: latest paginated view of every category
//! - [`SyncEngine`]: spawns and stops all of the above
//!
//! ## Example
//!
//! ```ignore
//! use hn_sync::SyncEngine;
//!
//! let mut engine = SyncEngine::new(remote, store, &settings);
//! engine.start();
//!
//! let page = engine.views().get_page(Category::Top, 1);
//!
//! engine.shutdown().await;
//! ```

pub mod backfill;
pub mod differ;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod reconciler;
pub mod update_log;
pub mod view;

pub use backfill::{BackfillReport, Backfiller};
pub use differ::diff;
pub use engine::SyncEngine;
pub use error::SyncError;
pub use fetcher::{DeadLetter, FetchReport, Fetcher, FetcherConfig, MAX_FETCH_CONCURRENCY};
pub use reconciler::{ChangeReconciler, CycleReport, ReconcileState};
pub use update_log::{UpdateLogConsumer, UpdateReport};
pub use view::{Page, PaginatedView, ViewCache};
