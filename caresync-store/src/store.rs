//! Encrypted client store — persists every entity kind as JSON with
//! plaintext index columns.
//!
//! Sealed kinds are stored as envelopes (see `caresync-crypto`); the index
//! columns (`idx_name`, `idx_status`, `idx_ref`) stay plaintext so filter
//! queries run without decryption.

use std::path::Path;
use std::sync::{Arc, Mutex};

use caresync_crypto::{is_envelope, open, seal, KeyContext, Salt};
use caresync_types::EntityKind;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::warn;

use crate::error::StorageResult;
use crate::policy::{IndexSpec, StorePolicy};

/// Local store backed by SQLite.
///
/// Cheap to clone; all clones share one connection and one key context.
#[derive(Clone)]
pub struct ClientStore {
    conn: Arc<Mutex<Connection>>,
    keys: Arc<Mutex<KeyContext>>,
    policy: Arc<StorePolicy>,
}

impl ClientStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: &Path, policy: StorePolicy) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            keys: Arc::new(Mutex::new(KeyContext::locked())),
            policy: Arc::new(policy),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory(policy: StorePolicy) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            keys: Arc::new(Mutex::new(KeyContext::locked())),
            policy: Arc::new(policy),
        })
    }

    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    pub fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    // ── Key lifecycle ────────────────────────────────────────────

    pub fn unlock_with_passphrase(&self, passphrase: &str, salt: &Salt) -> StorageResult<()> {
        self.keys
            .lock()
            .unwrap()
            .unlock_with_passphrase(passphrase, salt)?;
        Ok(())
    }

    pub fn unlock_from_file(&self, path: &Path) -> StorageResult<()> {
        self.keys.lock().unwrap().unlock_from_file(path)?;
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        self.keys.lock().unwrap().is_unlocked()
    }

    pub fn lock(&self) {
        self.keys.lock().unwrap().lock();
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Converts a record to its at-rest form: an envelope for sealed kinds,
    /// the record itself for plain kinds.
    ///
    /// Fails with `KeyNotInitialized` when the kind is sealed and the store
    /// is locked. Values that are already envelopes pass through unchanged.
    pub fn to_stored(&self, kind: EntityKind, id: &str, record: &Value) -> StorageResult<Value> {
        let kind_policy = self.policy.policy_for(kind);
        if !kind_policy.sealed {
            return Ok(record.clone());
        }
        let keys = self.keys.lock().unwrap();
        let key = keys.key()?;
        Ok(seal(key, id, record, &kind_policy.index.fields())?)
    }

    /// Seals (if the kind requires it) and persists a record.
    pub fn put(&self, kind: EntityKind, id: &str, record: &Value) -> StorageResult<()> {
        let stored = self.to_stored(kind, id, record)?;
        self.put_stored(kind, id, &stored)
    }

    /// Persists an already at-rest value, extracting index columns from the
    /// envelope index (sealed) or the record fields (plain).
    pub fn put_stored(&self, kind: EntityKind, id: &str, stored: &Value) -> StorageResult<()> {
        let index = self.policy.policy_for(kind).index;
        let (idx_name, idx_status, idx_ref) = index_columns(stored, &index);

        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO entities (entity_type, id, payload, idx_name, idx_status, idx_ref, created_at, modified_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT (entity_type, id) DO UPDATE SET
                payload = excluded.payload,
                idx_name = excluded.idx_name,
                idx_status = excluded.idx_status,
                idx_ref = excluded.idx_ref,
                modified_at = excluded.modified_at
            "#,
            params![
                kind.as_str(),
                id,
                serde_json::to_string(stored)?,
                idx_name,
                idx_status,
                idx_ref,
                now,
            ],
        )?;
        Ok(())
    }

    /// Removes a record. Returns whether a row existed.
    pub fn delete(&self, kind: EntityKind, id: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM entities WHERE entity_type = ?1 AND id = ?2",
            params![kind.as_str(), id],
        )?;
        Ok(affected > 0)
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Loads and opens a record.
    ///
    /// Returns `None` for missing rows and for rows that fail authentication
    /// (logged, never fatal). A locked store reading a sealed row fails with
    /// `KeyNotInitialized`.
    pub fn get(&self, kind: EntityKind, id: &str) -> StorageResult<Option<Value>> {
        let raw: Option<String> = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT payload FROM entities WHERE entity_type = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )
            .optional()?
        };

        match raw {
            Some(raw) => self.open_payload(kind, id, &raw),
            None => Ok(None),
        }
    }

    /// Loads every record of a kind, skipping rows that fail to open.
    pub fn get_all(&self, kind: EntityKind) -> StorageResult<Vec<Value>> {
        let rows = self.raw_payloads(
            "SELECT id, payload FROM entities WHERE entity_type = ?1 ORDER BY id",
            params![kind.as_str()],
        )?;
        self.open_rows(kind, rows)
    }

    /// Record ids matching an exact name, resolved from the plaintext index
    /// without touching key material.
    pub fn ids_by_name(&self, kind: EntityKind, name: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id FROM entities WHERE entity_type = ?1 AND idx_name = ?2 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![kind.as_str(), name], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> StorageResult<Vec<Value>> {
        let rows = self.raw_payloads(
            "SELECT id, payload FROM entities WHERE entity_type = ?1 AND idx_name = ?2 ORDER BY id",
            params![kind.as_str(), name],
        )?;
        self.open_rows(kind, rows)
    }

    pub fn find_by_status(&self, kind: EntityKind, status: &str) -> StorageResult<Vec<Value>> {
        let rows = self.raw_payloads(
            "SELECT id, payload FROM entities WHERE entity_type = ?1 AND idx_status = ?2 ORDER BY id",
            params![kind.as_str(), status],
        )?;
        self.open_rows(kind, rows)
    }

    /// Records whose reference index points at another record, e.g. all
    /// clinical notes for one patient.
    pub fn find_by_reference(&self, kind: EntityKind, reference: &str) -> StorageResult<Vec<Value>> {
        let rows = self.raw_payloads(
            "SELECT id, payload FROM entities WHERE entity_type = ?1 AND idx_ref = ?2 ORDER BY id",
            params![kind.as_str(), reference],
        )?;
        self.open_rows(kind, rows)
    }

    pub fn count(&self, kind: EntityKind) -> StorageResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE entity_type = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ── Internals ────────────────────────────────────────────────

    fn raw_payloads(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn open_rows(
        &self,
        kind: EntityKind,
        rows: Vec<(String, String)>,
    ) -> StorageResult<Vec<Value>> {
        let mut out = Vec::with_capacity(rows.len());
        for (id, raw) in rows {
            if let Some(record) = self.open_payload(kind, &id, &raw)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Decodes one stored payload. Authentication failures are logged and
    /// surfaced as `None`; a missing key is an error the caller must handle.
    fn open_payload(&self, kind: EntityKind, id: &str, raw: &str) -> StorageResult<Option<Value>> {
        let stored: Value = serde_json::from_str(raw)?;
        if !is_envelope(&stored) {
            return Ok(Some(stored));
        }

        let keys = self.keys.lock().unwrap();
        let key = keys.key()?;
        match open(key, &stored) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(entity_type = %kind, entity_id = %id, error = %e, "failed to open stored record, skipping");
                Ok(None)
            }
        }
    }
}

/// Index column values for a stored payload. Sealed payloads read from the
/// envelope's plaintext index map, plain payloads from the record itself.
fn index_columns(
    stored: &Value,
    index: &IndexSpec,
) -> (Option<String>, Option<String>, Option<String>) {
    let source = if is_envelope(stored) {
        stored.get("index")
    } else {
        Some(stored)
    };
    let lookup = |field: Option<&'static str>| -> Option<String> {
        let obj = source?.as_object()?;
        obj.get(field?).map(index_value)
    };
    (
        lookup(index.name_field),
        lookup(index.status_field),
        lookup(index.ref_field),
    )
}

/// Index columns are TEXT; non-string JSON values use their compact form
/// (`true`, `42`) so they stay comparable.
fn index_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entities (
            entity_type TEXT NOT NULL,
            id          TEXT NOT NULL,
            payload     TEXT NOT NULL,
            idx_name    TEXT,
            idx_status  TEXT,
            idx_ref     TEXT,
            created_at  TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            PRIMARY KEY (entity_type, id)
        );
        CREATE INDEX IF NOT EXISTS idx_entities_name   ON entities (entity_type, idx_name);
        CREATE INDEX IF NOT EXISTS idx_entities_status ON entities (entity_type, idx_status);
        CREATE INDEX IF NOT EXISTS idx_entities_ref    ON entities (entity_type, idx_ref);

        CREATE TABLE IF NOT EXISTS outbox (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            entity_type TEXT NOT NULL,
            entity_id   TEXT NOT NULL,
            operation   TEXT NOT NULL,
            payload     TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            device_id   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sync_meta (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conflicts (
            id                 TEXT PRIMARY KEY,
            entity_type        TEXT NOT NULL,
            entity_id          TEXT NOT NULL,
            local_payload      TEXT NOT NULL,
            remote_payload     TEXT NOT NULL,
            resolved           INTEGER NOT NULL DEFAULT 0,
            resolution_payload TEXT,
            created_at         TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
