//! Durable outbound change queue.
//!
//! Every local mutation is appended here before it is applied to the store,
//! so a crash between the two leaves a queued change rather than a silent
//! divergence. Entries survive restarts and leave the queue only once the
//! server acknowledges them.

use std::sync::{Arc, Mutex};

use caresync_types::{ChangeOperation, EntityKind, QueueEntry};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::store::ClientStore;

#[derive(Clone)]
pub struct Outbox {
    conn: Arc<Mutex<Connection>>,
}

impl Outbox {
    /// An outbox over the same database as the store.
    pub fn new(store: &ClientStore) -> Self {
        Self {
            conn: store.connection(),
        }
    }

    /// Appends an entry. Queue order is the insertion order.
    pub fn enqueue(&self, entry: &QueueEntry) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO outbox (id, entity_type, entity_id, operation, payload, created_at, device_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.id.to_string(),
                entry.entity_type.as_str(),
                entry.entity_id,
                entry.operation.as_str(),
                serde_json::to_string(&entry.payload)?,
                entry.created_at.to_rfc3339(),
                entry.device_id,
            ],
        )?;
        Ok(())
    }

    /// All pending entries, oldest first.
    pub fn list_pending(&self) -> StorageResult<Vec<QueueEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, entity_type, entity_id, operation, payload, created_at, device_id
             FROM outbox ORDER BY seq",
        )?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        entries.into_iter().collect()
    }

    /// Pending entries touching one entity, oldest first. Used to detect
    /// conflicts against incoming remote changes.
    pub fn pending_for_entity(
        &self,
        kind: EntityKind,
        entity_id: &str,
    ) -> StorageResult<Vec<QueueEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, entity_type, entity_id, operation, payload, created_at, device_id
             FROM outbox WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY seq",
        )?;
        let entries = stmt
            .query_map(params![kind.as_str(), entity_id], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        entries.into_iter().collect()
    }

    /// Removes an acknowledged entry. Retiring an id that is no longer
    /// queued is a no-op.
    pub fn retire(&self, id: Uuid) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM outbox WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    pub fn pending_count(&self) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM outbox", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<StorageResult<QueueEntry>> {
    let id: String = row.get(0)?;
    let entity_type: String = row.get(1)?;
    let entity_id: String = row.get(2)?;
    let operation: String = row.get(3)?;
    let payload: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let device_id: String = row.get(6)?;
    Ok(parse_entry(
        id, entity_type, entity_id, operation, payload, created_at, device_id,
    ))
}

fn parse_entry(
    id: String,
    entity_type: String,
    entity_id: String,
    operation: String,
    payload: String,
    created_at: String,
    device_id: String,
) -> StorageResult<QueueEntry> {
    Ok(QueueEntry {
        id: Uuid::parse_str(&id).map_err(|e| StorageError::InvalidRow(e.to_string()))?,
        entity_type: entity_type
            .parse::<EntityKind>()
            .map_err(|e| StorageError::InvalidRow(e.to_string()))?,
        entity_id,
        operation: ChangeOperation::parse(&operation)
            .ok_or_else(|| StorageError::InvalidRow(format!("unknown operation {operation}")))?,
        payload: serde_json::from_str(&payload)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StorageError::InvalidRow(e.to_string()))?
            .with_timezone(&chrono::Utc),
        device_id,
    })
}
