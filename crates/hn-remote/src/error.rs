//! Remote read errors.

use thiserror::Error;

/// Errors from reading the remote tree.
///
/// Cloneable so one failure can be delivered to several subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Remote returned HTTP {status} for {path}")]
    Status { path: String, status: u16 },

    #[error("Failed to decode remote value: {0}")]
    Decode(String),

    #[error("Timeout waiting for remote")]
    Timeout,

    #[error("Subscription closed")]
    Closed,
}

impl RemoteError {
    /// Whether a later attempt at the same read may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Http(_) | RemoteError::Timeout => true,
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Decode(_) | RemoteError::Closed => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Http(e.to_string())
        }
    }
}
