//! Entity models replicated from the system of record.
//!
//! Every model carries an opaque `revision` marker assigned by the remote
//! side for its own optimistic-concurrency checks; the client never
//! interprets it, only echoes it back on push.

mod appointment;
mod billing;
mod clinical_note;
mod encounter;
mod facility;
mod patient;
mod user;

pub use appointment::Appointment;
pub use billing::BillingEntry;
pub use clinical_note::{ClinicalNote, SoapItem, SoapSection};
pub use encounter::Encounter;
pub use facility::{Department, Device, Room};
pub use patient::Patient;
pub use user::User;
