//! Domain entities and sync change types for CareSync.
//!
//! Everything that moves through the local store, the outbound queue, and
//! the push/pull wire is defined here: the nine entity classes, their
//! shared enums and value types, the queue entry produced by every local
//! mutation, and the deferred conflict record.

pub mod change;
pub mod conflict;
pub mod kind;
pub mod models;
pub mod types;

pub use change::{ChangeOperation, QueueEntry};
pub use conflict::ConflictRecord;
pub use kind::EntityKind;
pub use models::{
    Appointment, BillingEntry, ClinicalNote, Department, Device, Encounter, Patient, Room,
    SoapItem, SoapSection, User,
};
pub use types::{
    Address, Allergy, AllergySeverity, AppointmentStatus, AppointmentType, BillingStatus,
    DeviceType, EmergencyContact, EncounterStatus, EncounterType, Gender, Id, InsuranceInfo,
    Medication, NoteStatus, NoteType, RoomType, SignatureData, Timestamp, UserRole,
};
