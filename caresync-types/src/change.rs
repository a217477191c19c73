//! Queue entries — the durable record of a local mutation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kind::EntityKind;
use crate::types::Timestamp;

/// Mutation operation carried by a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeOperation {
    Create,
    Update,
    Delete,
}

impl ChangeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOperation::Create => "CREATE",
            ChangeOperation::Update => "UPDATE",
            ChangeOperation::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(ChangeOperation::Create),
            "UPDATE" => Some(ChangeOperation::Update),
            "DELETE" => Some(ChangeOperation::Delete),
            _ => None,
        }
    }
}

/// One pending local mutation awaiting remote acknowledgment.
///
/// The payload holds the entity exactly as it is persisted locally —
/// an envelope for sealed entity classes, plain JSON otherwise. Entries
/// are append-only until retired; the operation is never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub operation: ChangeOperation,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub device_id: String,
}

impl QueueEntry {
    pub fn new(
        entity_type: EntityKind,
        entity_id: impl Into<String>,
        operation: ChangeOperation,
        payload: serde_json::Value,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type,
            entity_id: entity_id.into(),
            operation,
            payload,
            created_at: Utc::now(),
            device_id: device_id.into(),
        }
    }
}
