//! User record.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{Id, Timestamp, UserRole};

/// System user (physician, nurse, admin, ...). The client replicates a
/// projection of the remote user table; credentials never leave the
/// server, so no password material appears here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct User {
    pub id: Id,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub role: UserRole,
    pub department_id: Option<Id>,

    /// License number for clinical staff.
    pub license_number: Option<String>,
    /// National Provider Identifier.
    pub npi_number: Option<String>,

    pub active: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub last_login_at: Option<Timestamp>,

    pub revision: Option<String>,
}

impl User {
    pub fn new(email: String, name: String, role: UserRole) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            email,
            name,
            role,
            department_id: None,
            license_number: None,
            npi_number: None,
            active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            revision: None,
        }
    }

    pub fn is_clinical(&self) -> bool {
        matches!(self.role, UserRole::Physician | UserRole::Nurse)
    }
}
