//! Sync error types.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("remote rejected change: {0}")]
    Rejected(String),

    #[error("storage error: {0}")]
    Storage(#[from] caresync_store::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sync engine not running")]
    EngineStopped,
}
