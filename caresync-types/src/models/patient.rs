//! Patient record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{
    Address, Allergy, EmergencyContact, Gender, Id, InsuranceInfo, Medication, Timestamp,
};

/// Patient entity — the primary sealed entity class. Everything beyond
/// the index whitelist (last name, active flag) is confidential at rest.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Patient {
    pub id: Id,

    /// Medical record number, unique per installation.
    #[validate(length(min = 1, max = 50))]
    pub medical_record_number: String,

    #[validate(length(min = 1, max = 100))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100))]
    pub last_name: String,

    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: Address,

    #[validate(length(max = 20))]
    pub phone: String,

    #[validate(email)]
    pub email: Option<String>,

    pub emergency_contact: EmergencyContact,
    pub primary_care_physician_id: Option<Id>,
    pub insurance_info: InsuranceInfo,

    pub allergies: Vec<Allergy>,
    pub medications: Vec<Medication>,
    /// Problem list / diagnoses. Never whitelisted for indexing.
    pub problems: Vec<String>,

    pub active: bool,
    pub deceased: bool,
    pub deceased_at: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    /// Opaque remote versioning marker.
    pub revision: Option<String>,
    pub last_modified_by: Option<String>,
}

impl Patient {
    pub fn new(
        medical_record_number: String,
        first_name: String,
        last_name: String,
        date_of_birth: NaiveDate,
        gender: Gender,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            medical_record_number,
            first_name,
            last_name,
            date_of_birth,
            gender,
            address: Address::default(),
            phone: String::new(),
            email: None,
            emergency_contact: EmergencyContact::default(),
            primary_care_physician_id: None,
            insurance_info: InsuranceInfo::default(),
            allergies: Vec::new(),
            medications: Vec::new(),
            problems: Vec::new(),
            active: true,
            deceased: false,
            deceased_at: None,
            created_at: now,
            updated_at: now,
            revision: None,
            last_modified_by: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age(&self) -> u32 {
        let today = chrono::Utc::now().date_naive();
        today.years_since(self.date_of_birth).unwrap_or(0)
    }

    /// Adds an allergy unless one with the same name already exists.
    pub fn add_allergy(&mut self, allergy: Allergy) {
        if !self.allergies.iter().any(|a| a.name == allergy.name) {
            self.allergies.push(allergy);
            self.updated_at = chrono::Utc::now();
        }
    }

    pub fn remove_allergy(&mut self, allergy_id: Id) {
        self.allergies.retain(|a| a.id != allergy_id);
        self.updated_at = chrono::Utc::now();
    }

    pub fn add_medication(&mut self, medication: Medication) {
        self.medications.push(medication);
        self.updated_at = chrono::Utc::now();
    }

    pub fn has_allergy(&self, name: &str) -> bool {
        self.allergies
            .iter()
            .any(|a| a.name.eq_ignore_ascii_case(name))
    }
}
