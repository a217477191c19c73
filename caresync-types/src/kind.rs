//! Entity class tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The nine entity classes the client replicates from the system of record.
///
/// The string form doubles as the local collection name and the
/// `entityType` wire tag for push/pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Patient,
    Appointment,
    ClinicalNote,
    BillingEntry,
    User,
    Device,
    Room,
    Department,
    Encounter,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Patient,
        EntityKind::Appointment,
        EntityKind::ClinicalNote,
        EntityKind::BillingEntry,
        EntityKind::User,
        EntityKind::Device,
        EntityKind::Room,
        EntityKind::Department,
        EntityKind::Encounter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Patient => "Patient",
            EntityKind::Appointment => "Appointment",
            EntityKind::ClinicalNote => "ClinicalNote",
            EntityKind::BillingEntry => "BillingEntry",
            EntityKind::User => "User",
            EntityKind::Device => "Device",
            EntityKind::Room => "Room",
            EntityKind::Department => "Department",
            EntityKind::Encounter => "Encounter",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown entity type tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown entity kind: {0}")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownEntityKind(s.to_string()))
    }
}
