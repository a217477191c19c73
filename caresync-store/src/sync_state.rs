//! Persisted sync bookkeeping: the pull checkpoint and the conflict log.

use std::sync::{Arc, Mutex};

use caresync_types::{ConflictRecord, EntityKind, Timestamp};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::store::ClientStore;

const CHECKPOINT_KEY: &str = "last_sync_time";

/// Key/value metadata shared with the sync engine.
#[derive(Clone)]
pub struct SyncMeta {
    conn: Arc<Mutex<Connection>>,
}

impl SyncMeta {
    pub fn new(store: &ClientStore) -> Self {
        Self {
            conn: store.connection(),
        }
    }

    /// The high-water mark of applied remote changes, if a pull has ever
    /// completed.
    pub fn checkpoint(&self) -> StorageResult<Option<Timestamp>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![CHECKPOINT_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(
                chrono::DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| StorageError::InvalidRow(e.to_string()))?
                    .with_timezone(&chrono::Utc),
            )),
            None => Ok(None),
        }
    }

    /// Advances the checkpoint. The stored value never moves backwards, so
    /// a delayed writer cannot widen the next pull window.
    pub fn set_checkpoint(&self, at: Timestamp) -> StorageResult<()> {
        if let Some(current) = self.checkpoint()? {
            if at <= current {
                return Ok(());
            }
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO sync_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![
                CHECKPOINT_KEY,
                at.to_rfc3339(),
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

/// Durable record of detected-but-unresolved conflicts.
///
/// Conflicts are never auto-merged; they are logged here and left for a
/// person to resolve. Resolution marks the record, it never deletes it.
#[derive(Clone)]
pub struct ConflictLog {
    conn: Arc<Mutex<Connection>>,
}

impl ConflictLog {
    pub fn new(store: &ClientStore) -> Self {
        Self {
            conn: store.connection(),
        }
    }

    pub fn record(&self, conflict: &ConflictRecord) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO conflicts (id, entity_type, entity_id, local_payload, remote_payload, resolved, resolution_payload, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                conflict.id.to_string(),
                conflict.entity_type.as_str(),
                conflict.entity_id,
                serde_json::to_string(&conflict.local_payload)?,
                serde_json::to_string(&conflict.remote_payload)?,
                conflict.resolved,
                conflict
                    .resolution_payload
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                conflict.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_unresolved(&self) -> StorageResult<Vec<ConflictRecord>> {
        self.query(
            "SELECT id, entity_type, entity_id, local_payload, remote_payload, resolved, resolution_payload, created_at
             FROM conflicts WHERE resolved = 0 ORDER BY created_at",
            params![],
        )
    }

    pub fn list_for_entity(
        &self,
        kind: EntityKind,
        entity_id: &str,
    ) -> StorageResult<Vec<ConflictRecord>> {
        self.query(
            "SELECT id, entity_type, entity_id, local_payload, remote_payload, resolved, resolution_payload, created_at
             FROM conflicts WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY created_at",
            params![kind.as_str(), entity_id],
        )
    }

    /// Marks a conflict resolved, keeping the chosen payload for audit.
    pub fn resolve(&self, id: Uuid, resolution: &Value) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE conflicts SET resolved = 1, resolution_payload = ?2 WHERE id = ?1 AND resolved = 0",
            params![id.to_string(), serde_json::to_string(resolution)?],
        )?;
        Ok(affected > 0)
    }

    fn query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<ConflictRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, row_to_conflict)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }
}

fn row_to_conflict(row: &Row<'_>) -> rusqlite::Result<StorageResult<ConflictRecord>> {
    let id: String = row.get(0)?;
    let entity_type: String = row.get(1)?;
    let entity_id: String = row.get(2)?;
    let local_payload: String = row.get(3)?;
    let remote_payload: String = row.get(4)?;
    let resolved: bool = row.get(5)?;
    let resolution_payload: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok((|| {
        Ok(ConflictRecord {
            id: Uuid::parse_str(&id).map_err(|e| StorageError::InvalidRow(e.to_string()))?,
            entity_type: entity_type
                .parse::<EntityKind>()
                .map_err(|e| StorageError::InvalidRow(e.to_string()))?,
            entity_id,
            local_payload: serde_json::from_str(&local_payload)?,
            remote_payload: serde_json::from_str(&remote_payload)?,
            resolved,
            resolution_payload: resolution_payload
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::InvalidRow(e.to_string()))?
                .with_timezone(&chrono::Utc),
        })
    })())
}
