//! Deferred conflict records.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kind::EntityKind;
use crate::types::Timestamp;

/// A remote change that collided with an in-flight local change.
///
/// Produced by the sync engine at detection time; both payloads are
/// preserved verbatim for a human resolution workflow. Records are never
/// deleted — resolution only sets `resolved` and the resolution payload,
/// leaving an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub id: Uuid,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub local_payload: serde_json::Value,
    pub remote_payload: serde_json::Value,
    pub resolved: bool,
    pub resolution_payload: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

impl ConflictRecord {
    pub fn new(
        entity_type: EntityKind,
        entity_id: impl Into<String>,
        local_payload: serde_json::Value,
        remote_payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type,
            entity_id: entity_id.into(),
            local_payload,
            remote_payload,
            resolved: false,
            resolution_payload: None,
            created_at: Utc::now(),
        }
    }
}
