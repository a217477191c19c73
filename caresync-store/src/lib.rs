//! SQLite storage layer for CareSync.
//!
//! Everything the client persists lives in one database file:
//!
//! - `entities` holds every record as JSON, sealed for sensitive kinds,
//!   with plaintext index columns for lookups
//! - `outbox` is the durable queue of local changes awaiting push
//! - `sync_meta` carries the pull checkpoint
//! - `conflicts` logs detected conflicts for later human resolution
//!
//! The write path is queue first, apply second: a local change is appended
//! to the outbox before the optimistic write touches `entities`.

mod error;
mod outbox;
mod policy;
mod store;
mod sync_state;

pub use error::{StorageError, StorageResult};
pub use outbox::Outbox;
pub use policy::{IndexSpec, KindPolicy, StorePolicy};
pub use store::ClientStore;
pub use sync_state::{ConflictLog, SyncMeta};
