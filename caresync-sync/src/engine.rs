//! Sync engine.
//!
//! Owns the full local-change lifecycle:
//!
//! 1. `record_change` appends to the durable outbox, then applies the
//!    change optimistically to the local store. Queue first, apply second.
//! 2. A sync cycle pushes pending queue entries one at a time (aborting on
//!    the first failure so queue order is preserved), then pulls remote
//!    changes since the checkpoint and applies them.
//! 3. A remote change that lands on an entity with queued local changes is
//!    never merged: it is written to the conflict log and the local state
//!    stays in place until someone resolves it.
//!
//! The engine runs as a single task fed by a command channel; the
//! [`SyncHandle`] is the clonable front door for the application layer.

use std::sync::Arc;
use std::time::Duration;

use caresync_store::{ClientStore, ConflictLog, Outbox, SyncMeta};
use caresync_types::{ChangeOperation, ConflictRecord, EntityKind, QueueEntry, Timestamp};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::retry::{FixedInterval, RetryPolicy};
use crate::transport::{PushRequest, RemoteChange, RemoteTransport};

/// Engine lifecycle state, surfaced through [`SyncStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Online,
    Offline,
    Syncing,
    Error,
}

/// Snapshot of the engine for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub pending_changes: u64,
    pub unresolved_conflicts: u64,
    pub last_sync: Option<Timestamp>,
    pub device_id: String,
}

/// How a sync trigger was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRun {
    Completed,
    /// The engine is offline; the trigger was dropped, not queued.
    SkippedOffline,
    /// A cycle is already in flight; the trigger was dropped, not queued.
    SkippedBusy,
}

/// Tally from applying one batch of remote changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: u32,
    pub conflicted: u32,
}

/// What happened to one pulled remote change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyOutcome {
    Applied,
    Conflicted,
    /// Echo of this device's own change, ignored.
    Own,
}

pub enum SyncCommand {
    SyncNow,
    SetConnectivity(bool),
    RecordChange {
        entity_type: EntityKind,
        entity_id: String,
        operation: ChangeOperation,
        record: Value,
        reply: oneshot::Sender<SyncResult<()>>,
    },
    Status {
        reply: oneshot::Sender<SyncResult<SyncStatus>>,
    },
    Stop,
}

/// Clonable handle for sending commands to a running engine.
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    pub async fn sync_now(&self) -> SyncResult<()> {
        self.send(SyncCommand::SyncNow).await
    }

    pub async fn set_connectivity(&self, online: bool) -> SyncResult<()> {
        self.send(SyncCommand::SetConnectivity(online)).await
    }

    /// Queues and optimistically applies a local change. For deletes the
    /// record is ignored; pass `Value::Null`.
    pub async fn record_change(
        &self,
        entity_type: EntityKind,
        entity_id: String,
        operation: ChangeOperation,
        record: Value,
    ) -> SyncResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncCommand::RecordChange {
            entity_type,
            entity_id,
            operation,
            record,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SyncError::EngineStopped)?
    }

    pub async fn status(&self) -> SyncResult<SyncStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncCommand::Status { reply }).await?;
        rx.await.map_err(|_| SyncError::EngineStopped)?
    }

    pub async fn stop(&self) -> SyncResult<()> {
        self.send(SyncCommand::Stop).await
    }

    async fn send(&self, command: SyncCommand) -> SyncResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SyncError::EngineStopped)
    }
}

/// Creates an engine and its command handle. The engine does nothing until
/// [`SyncEngine::run`] is awaited on a task.
pub fn create_sync_engine(
    store: ClientStore,
    transport: Arc<dyn RemoteTransport>,
    config: SyncConfig,
) -> (SyncHandle, SyncEngine) {
    let (command_tx, command_rx) = mpsc::channel(64);
    let handle = SyncHandle { command_tx };
    let engine = SyncEngine::new(store, transport, config, command_rx);
    (handle, engine)
}

pub struct SyncEngine {
    outbox: Outbox,
    conflicts: ConflictLog,
    meta: SyncMeta,
    store: ClientStore,
    transport: Arc<dyn RemoteTransport>,
    retry: Box<dyn RetryPolicy>,
    command_rx: mpsc::Receiver<SyncCommand>,
    device_id: String,
    sync_interval: Duration,
    state: SyncState,
    connectivity: bool,
    consecutive_failures: u32,
    last_sync: Option<Timestamp>,
}

impl SyncEngine {
    fn new(
        store: ClientStore,
        transport: Arc<dyn RemoteTransport>,
        config: SyncConfig,
        command_rx: mpsc::Receiver<SyncCommand>,
    ) -> Self {
        Self {
            outbox: Outbox::new(&store),
            conflicts: ConflictLog::new(&store),
            meta: SyncMeta::new(&store),
            store,
            transport,
            retry: Box::new(FixedInterval::default()),
            command_rx,
            device_id: config.device_id,
            sync_interval: Duration::from_secs(config.sync_interval_secs),
            state: SyncState::Online,
            // Assume a link until told otherwise; the first failed cycle
            // corrects the optimism.
            connectivity: true,
            consecutive_failures: 0,
            last_sync: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: Box<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Runs the engine event loop until `Stop` or channel closure.
    pub async fn run(&mut self) {
        info!(device_id = %self.device_id, "sync engine started");

        loop {
            let delay = if self.consecutive_failures > 0 {
                self.retry.delay_after(self.consecutive_failures)
            } else {
                self.sync_interval
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = self.sync_now().await {
                        error!(error = %e, "periodic sync failed");
                    }
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SyncCommand::SyncNow) => {
                            if let Err(e) = self.sync_now().await {
                                error!(error = %e, "requested sync failed");
                            }
                        }
                        Some(SyncCommand::SetConnectivity(online)) => {
                            self.set_connectivity(online);
                            if online {
                                if let Err(e) = self.sync_now().await {
                                    error!(error = %e, "reconnect sync failed");
                                }
                            }
                        }
                        Some(SyncCommand::RecordChange { entity_type, entity_id, operation, record, reply }) => {
                            let result = self.record_change(entity_type, &entity_id, operation, record);
                            let queued = result.is_ok();
                            let _ = reply.send(result);
                            // A sync failure here leaves the entry queued for the next cycle.
                            if queued && self.connectivity {
                                if let Err(e) = self.sync_now().await {
                                    warn!(error = %e, "post-change sync failed");
                                }
                            }
                        }
                        Some(SyncCommand::Status { reply }) => {
                            let _ = reply.send(self.status());
                        }
                        Some(SyncCommand::Stop) | None => {
                            info!("sync engine stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    pub fn status(&self) -> SyncResult<SyncStatus> {
        Ok(SyncStatus {
            state: self.state,
            pending_changes: self.outbox.pending_count()?,
            unresolved_conflicts: self.conflicts.list_unresolved()?.len() as u64,
            last_sync: self.last_sync,
            device_id: self.device_id.clone(),
        })
    }

    pub fn set_connectivity(&mut self, online: bool) {
        if self.connectivity == online {
            return;
        }
        info!(online, "connectivity changed");
        self.connectivity = online;
        if !online {
            self.state = SyncState::Offline;
        } else if self.state == SyncState::Offline {
            self.state = SyncState::Online;
        }
    }

    /// Queues a local change durably, then applies it to the store.
    ///
    /// The queue write happens first: a crash between the two leaves a
    /// pending entry, never an unqueued local edit. For sealed kinds the
    /// payload is the envelope, so the queue holds no plaintext.
    pub fn record_change(
        &mut self,
        entity_type: EntityKind,
        entity_id: &str,
        operation: ChangeOperation,
        record: Value,
    ) -> SyncResult<()> {
        let payload = match operation {
            ChangeOperation::Delete => Value::Null,
            _ => self.store.to_stored(entity_type, entity_id, &record)?,
        };

        let entry = QueueEntry::new(
            entity_type,
            entity_id,
            operation,
            payload.clone(),
            self.device_id.clone(),
        );
        self.outbox.enqueue(&entry)?;

        match operation {
            ChangeOperation::Delete => {
                self.store.delete(entity_type, entity_id)?;
            }
            _ => {
                self.store.put_stored(entity_type, entity_id, &payload)?;
            }
        }

        debug!(entity_type = %entity_type, entity_id, operation = operation.as_str(), "change queued");
        Ok(())
    }

    /// Runs one sync cycle now. Triggers that arrive while a cycle is in
    /// flight, or while offline, are dropped rather than queued.
    pub async fn sync_now(&mut self) -> SyncResult<SyncRun> {
        if self.state == SyncState::Syncing {
            debug!("sync already in progress, dropping trigger");
            return Ok(SyncRun::SkippedBusy);
        }
        if !self.connectivity {
            debug!("offline, dropping sync trigger");
            return Ok(SyncRun::SkippedOffline);
        }

        self.state = SyncState::Syncing;
        match self.run_cycle().await {
            Ok(()) => {
                self.state = SyncState::Online;
                self.consecutive_failures = 0;
                self.last_sync = Some(chrono::Utc::now());
                Ok(SyncRun::Completed)
            }
            Err(e) => {
                self.state = SyncState::Error;
                self.consecutive_failures += 1;
                warn!(error = %e, failures = self.consecutive_failures, "sync cycle failed");
                Err(e)
            }
        }
    }

    async fn run_cycle(&mut self) -> SyncResult<()> {
        self.push_pending().await?;

        // Captured before the pull so changes landing on the server during
        // the cycle fall into the next window.
        let cycle_start = chrono::Utc::now();
        self.pull_and_apply().await?;
        self.meta.set_checkpoint(cycle_start)?;
        Ok(())
    }

    /// Pushes queue entries oldest first, retiring each only on server
    /// acknowledgment. Aborts on the first failure so later entries never
    /// overtake earlier ones.
    async fn push_pending(&mut self) -> SyncResult<()> {
        let pending = self.outbox.list_pending()?;
        if pending.is_empty() {
            return Ok(());
        }
        info!(count = pending.len(), "pushing pending changes");

        for entry in pending {
            self.transport.push(&PushRequest::from_entry(&entry)).await?;
            self.outbox.retire(entry.id)?;
        }
        Ok(())
    }

    async fn pull_and_apply(&mut self) -> SyncResult<()> {
        let since = self.meta.checkpoint()?;
        let changes = self.transport.pull(since).await?;
        if changes.is_empty() {
            return Ok(());
        }
        self.apply_remote_changes(changes)?;
        Ok(())
    }

    /// Applies a batch of remote changes. Part of every pull cycle, and
    /// also callable directly when the server delivers changes out of band.
    pub fn apply_remote_changes(&mut self, changes: Vec<RemoteChange>) -> SyncResult<ApplyReport> {
        let mut report = ApplyReport::default();
        for change in changes {
            match self.apply_remote(change)? {
                ApplyOutcome::Applied => report.applied += 1,
                ApplyOutcome::Conflicted => report.conflicted += 1,
                ApplyOutcome::Own => {}
            }
        }
        info!(
            applied = report.applied,
            conflicted = report.conflicted,
            "applied remote changes"
        );
        Ok(report)
    }

    /// Applies one remote change, or defers it as a conflict when this
    /// device has queued changes for the same entity.
    fn apply_remote(&mut self, change: RemoteChange) -> SyncResult<ApplyOutcome> {
        if change.device_id == self.device_id {
            return Ok(ApplyOutcome::Own);
        }

        let pending = self
            .outbox
            .pending_for_entity(change.entity_type, &change.entity_id)?;
        if let Some(local) = pending.last() {
            warn!(
                entity_type = %change.entity_type,
                entity_id = %change.entity_id,
                "remote change collides with queued local change, deferring"
            );
            self.conflicts.record(&ConflictRecord::new(
                change.entity_type,
                change.entity_id.clone(),
                local.payload.clone(),
                change.data,
            ))?;
            return Ok(ApplyOutcome::Conflicted);
        }

        match change.operation {
            ChangeOperation::Delete => {
                self.store.delete(change.entity_type, &change.entity_id)?;
            }
            ChangeOperation::Create | ChangeOperation::Update => {
                // Pulled payloads arrive in the server's plain shape; put
                // seals them per policy (envelopes pass through unchanged).
                self.store
                    .put(change.entity_type, &change.entity_id, &change.data)?;
            }
        }
        Ok(ApplyOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // State transition coverage lives here; full cycle behavior is covered
    // in the integration tests with a scripted transport.

    struct NoopTransport;

    #[async_trait::async_trait]
    impl RemoteTransport for NoopTransport {
        async fn push(&self, _change: &PushRequest) -> SyncResult<()> {
            Ok(())
        }
        async fn pull(&self, _since: Option<Timestamp>) -> SyncResult<Vec<RemoteChange>> {
            Ok(Vec::new())
        }
    }

    fn engine() -> SyncEngine {
        let store = ClientStore::open_in_memory(caresync_store::StorePolicy::clinical_default())
            .unwrap();
        let (_handle, engine) =
            create_sync_engine(store, Arc::new(NoopTransport), SyncConfig::default());
        engine
    }

    #[tokio::test]
    async fn busy_engine_drops_triggers() {
        let mut e = engine();
        e.state = SyncState::Syncing;
        assert_eq!(e.sync_now().await.unwrap(), SyncRun::SkippedBusy);
        // The dropped trigger must not disturb the in-flight state.
        assert_eq!(e.state(), SyncState::Syncing);
    }

    #[tokio::test]
    async fn offline_engine_drops_triggers() {
        let mut e = engine();
        e.set_connectivity(false);
        assert_eq!(e.sync_now().await.unwrap(), SyncRun::SkippedOffline);
        assert_eq!(e.state(), SyncState::Offline);
    }

    #[tokio::test]
    async fn reconnect_restores_online_state() {
        let mut e = engine();
        e.set_connectivity(false);
        e.set_connectivity(true);
        assert_eq!(e.state(), SyncState::Online);
    }

    #[tokio::test]
    async fn successful_cycle_sets_last_sync() {
        let mut e = engine();
        assert_eq!(e.sync_now().await.unwrap(), SyncRun::Completed);
        let status = e.status().unwrap();
        assert_eq!(status.state, SyncState::Online);
        assert!(status.last_sync.is_some());
    }
}
