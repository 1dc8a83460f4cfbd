//! The remote source seam and its change subscriptions.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::RemoteError;
use crate::path::RemotePath;

/// One notification from a subscribed path.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// The current value at the path. `Null` when nothing is stored there.
    Value(Value),
    /// Reading the path failed; the subscription stays open.
    Error(RemoteError),
}

/// Stream of change notifications for one path.
///
/// Dropping the subscription stops whatever task feeds it.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<RemoteEvent>,
}

impl Subscription {
    /// Create a bounded subscription and the sender that feeds it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<RemoteEvent>, Subscription) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Subscription { rx })
    }

    /// Wait for the next event. `None` once the feeding side is gone.
    pub async fn next(&mut self) -> Option<RemoteEvent> {
        self.rx.recv().await
    }
}

/// Read access to the remote tree.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Read the value at `path` once. `Ok(None)` when nothing is stored.
    async fn read(&self, path: &RemotePath) -> Result<Option<Value>, RemoteError>;

    /// Follow `path`. The first event carries the current value; later
    /// events are sent each time the value changes.
    fn subscribe(&self, path: RemotePath) -> Subscription;
}
