//! Error types for the sync engine.

use hn_remote::RemoteError;
use hn_search::SearchError;
use thiserror::Error;

/// Errors that can occur while synchronizing with the remote tree.
///
/// None of these escape the engine's public operations: each one is
/// logged at the operation boundary and turned into "keep prior state".
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote read failed, timed out, or returned an undecodable value
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(#[from] RemoteError),

    /// Local item store failed
    #[error("Index unavailable: {0}")]
    IndexUnavailable(#[from] SearchError),

    /// Ranked list value was not an array
    #[error("Malformed ranked list: {0}")]
    MalformedRankedList(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::RemoteUnavailable(RemoteError::Decode(err.to_string()))
    }
}

impl SyncError {
    /// Whether retrying the same remote read may help.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::RemoteUnavailable(e) => e.is_transient(),
            SyncError::IndexUnavailable(_) | SyncError::MalformedRankedList(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::MalformedRankedList("object".to_string());
        assert_eq!(err.to_string(), "Malformed ranked list: object");

        let err = SyncError::from(RemoteError::Timeout);
        assert_eq!(err.to_string(), "Remote unavailable: Timeout waiting for remote");
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let sync_err: SyncError = json_err.into();
        assert!(matches!(
            sync_err,
            SyncError::RemoteUnavailable(RemoteError::Decode(_))
        ));
        assert!(!sync_err.is_transient());
    }
}
