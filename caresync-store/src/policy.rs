//! Per-kind storage policy: which kinds are sealed at rest and which
//! record fields feed the plaintext index columns.

use std::collections::HashMap;

use caresync_types::EntityKind;

/// Record fields copied into the plaintext index columns.
///
/// Each slot maps one JSON field to a fixed column so lookups work without
/// decryption. Unset slots leave the column NULL.
#[derive(Clone, Debug, Default)]
pub struct IndexSpec {
    pub name_field: Option<&'static str>,
    pub status_field: Option<&'static str>,
    pub ref_field: Option<&'static str>,
}

impl IndexSpec {
    /// Fields to carry inside a sealed envelope, in column order.
    pub fn fields(&self) -> Vec<&'static str> {
        [self.name_field, self.status_field, self.ref_field]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct KindPolicy {
    /// Sealed kinds are encrypted at rest; plain kinds store raw JSON.
    pub sealed: bool,
    pub index: IndexSpec,
}

/// The store's view of how each entity kind is persisted.
///
/// Kinds without an entry default to plain storage with no index columns.
#[derive(Clone, Debug, Default)]
pub struct StorePolicy {
    kinds: HashMap<EntityKind, KindPolicy>,
}

impl StorePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: EntityKind, policy: KindPolicy) -> Self {
        self.kinds.insert(kind, policy);
        self
    }

    pub fn policy_for(&self, kind: EntityKind) -> KindPolicy {
        self.kinds.get(&kind).cloned().unwrap_or_default()
    }

    pub fn is_sealed(&self, kind: EntityKind) -> bool {
        self.policy_for(kind).sealed
    }

    /// The clinical deployment policy: patient and note records are sealed,
    /// scheduling and facility records stay plain.
    pub fn clinical_default() -> Self {
        Self::new()
            .with_kind(
                EntityKind::Patient,
                KindPolicy {
                    sealed: true,
                    index: IndexSpec {
                        name_field: Some("last_name"),
                        status_field: Some("active"),
                        ref_field: None,
                    },
                },
            )
            .with_kind(
                EntityKind::ClinicalNote,
                KindPolicy {
                    sealed: true,
                    index: IndexSpec {
                        name_field: None,
                        status_field: Some("status"),
                        ref_field: Some("patient_id"),
                    },
                },
            )
            .with_kind(
                EntityKind::Appointment,
                KindPolicy {
                    sealed: false,
                    index: IndexSpec {
                        name_field: None,
                        status_field: Some("status"),
                        ref_field: Some("patient_id"),
                    },
                },
            )
            .with_kind(
                EntityKind::BillingEntry,
                KindPolicy {
                    sealed: false,
                    index: IndexSpec {
                        name_field: None,
                        status_field: Some("status"),
                        ref_field: Some("patient_id"),
                    },
                },
            )
            .with_kind(
                EntityKind::Encounter,
                KindPolicy {
                    sealed: false,
                    index: IndexSpec {
                        name_field: None,
                        status_field: Some("status"),
                        ref_field: Some("patient_id"),
                    },
                },
            )
            .with_kind(
                EntityKind::Room,
                KindPolicy {
                    sealed: false,
                    index: IndexSpec {
                        name_field: Some("name"),
                        status_field: Some("active"),
                        ref_field: Some("department_id"),
                    },
                },
            )
            .with_kind(
                EntityKind::Department,
                KindPolicy {
                    sealed: false,
                    index: IndexSpec {
                        name_field: Some("name"),
                        status_field: Some("active"),
                        ref_field: None,
                    },
                },
            )
    }
}
