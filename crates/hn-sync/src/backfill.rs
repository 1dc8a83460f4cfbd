//! Startup backfill of recent items.
//!
//! Reads `maxitem` and walks the most recent `window` ids downward in
//! chunks. With `resume_history` set it then keeps walking from just below
//! the lowest stored id down to id 1, so repeated runs extend the mirror
//! further into the past.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hn_remote::{RemotePath, RemoteSource};
use hn_search::ItemStore;
use hn_types::BackfillSettings;

use crate::fetcher::{FetchReport, Fetcher};

/// Totals for one backfill run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackfillReport {
    /// Largest item id upstream when the run started
    pub max_item: Option<u64>,
    /// Ids handed to the fetcher
    pub walked: u64,
    pub fetched: usize,
    pub missing: usize,
    pub dead_letters: usize,
    /// Run stopped early on shutdown
    pub interrupted: bool,
}

impl BackfillReport {
    fn absorb(&mut self, report: &FetchReport) {
        self.walked += report.attempted as u64;
        self.fetched += report.fetched;
        self.missing += report.missing;
        self.dead_letters += report.dead_letters.len();
    }
}

/// Walks item ids downward from the newest.
pub struct Backfiller {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn ItemStore>,
    fetcher: Arc<Fetcher>,
    settings: BackfillSettings,
}

impl Backfiller {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn ItemStore>,
        fetcher: Arc<Fetcher>,
        settings: BackfillSettings,
    ) -> Self {
        Self {
            remote,
            store,
            fetcher,
            settings,
        }
    }

    /// Run the backfill once. Shutdown is checked between chunks.
    pub async fn run(&self, shutdown: CancellationToken) -> BackfillReport {
        let mut report = BackfillReport::default();

        if !self.settings.enabled || self.settings.window == 0 {
            debug!("Backfill disabled");
            return report;
        }

        let Some(max_item) = self.read_max_item().await else {
            return report;
        };
        report.max_item = Some(max_item);

        let low = max_item.saturating_sub(self.settings.window - 1).max(1);
        info!(max_item, low, window = self.settings.window, "Backfilling recent items");

        if !self.walk(max_item, low, &mut report, &shutdown).await {
            report.interrupted = true;
            return report;
        }

        if self.settings.resume_history {
            match self.store.lowest_item_id().await {
                Ok(Some(lowest)) if lowest > 1 => {
                    info!(from = lowest - 1, "Resuming history walk");
                    if !self.walk(lowest - 1, 1, &mut report, &shutdown).await {
                        report.interrupted = true;
                        return report;
                    }
                }
                Ok(_) => debug!("History walk already complete"),
                Err(e) => warn!(error = %e, "Could not find lowest stored item"),
            }
        }

        info!(
            walked = report.walked,
            fetched = report.fetched,
            missing = report.missing,
            dead_letters = report.dead_letters,
            "Backfill complete"
        );
        report
    }

    async fn read_max_item(&self) -> Option<u64> {
        match self.remote.read(&RemotePath::MaxItem).await {
            Ok(Some(value)) => match value.as_u64() {
                Some(max_item) if max_item > 0 => Some(max_item),
                _ => {
                    warn!(value = %value, "maxitem is not a positive integer");
                    None
                }
            },
            Ok(None) => {
                warn!("maxitem is missing upstream");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read maxitem, skipping backfill");
                None
            }
        }
    }

    /// Fetch `high` down to `low` inclusive. Returns false if interrupted.
    async fn walk(
        &self,
        high: u64,
        low: u64,
        report: &mut BackfillReport,
        shutdown: &CancellationToken,
    ) -> bool {
        let chunk_size = self.settings.chunk_size.max(1) as u64;
        let mut next = high;

        while next >= low {
            if shutdown.is_cancelled() {
                info!(next, "Backfill interrupted");
                return false;
            }

            let end = next.saturating_sub(chunk_size - 1).max(low);
            let ids: Vec<u64> = (end..=next).rev().collect();
            let fetched = self.fetcher.fetch_many(&ids).await;
            report.absorb(&fetched);
            debug!(from = next, to = end, fetched = fetched.fetched, "Backfilled chunk");

            if end <= 1 {
                break;
            }
            next = end - 1;
        }
        true
    }
}
