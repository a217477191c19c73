//! Sync engine for CareSync.
//!
//! Pushes the durable outbox to the server, pulls changes from other
//! devices, and defers conflicting writes to the conflict log instead of
//! merging them. See [`engine`] for the lifecycle.

mod config;
pub mod engine;
mod error;
pub mod retry;
pub mod transport;

pub use config::SyncConfig;
pub use engine::{
    create_sync_engine, ApplyReport, SyncCommand, SyncEngine, SyncHandle, SyncRun, SyncState,
    SyncStatus,
};
pub use error::{SyncError, SyncResult};
pub use retry::{ExponentialBackoff, FixedInterval, RetryPolicy};
pub use transport::{HttpTransport, PushRequest, RemoteChange, RemoteTransport};
