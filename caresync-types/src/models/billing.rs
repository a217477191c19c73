//! Billing entry record.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{BillingStatus, Id, Timestamp};

/// Billing entry for a coded procedure. Monetary amounts are carried as
/// decimal strings so no precision is lost across the wire.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BillingEntry {
    pub id: Id,
    pub patient_id: Id,
    pub encounter_id: Id,
    pub provider_id: Id,

    /// CPT procedure code.
    #[validate(length(min = 1, max = 10))]
    pub cpt_code: String,

    /// ICD-10 diagnosis codes.
    pub icd10_codes: Vec<String>,

    #[validate(length(min = 1, max = 500))]
    pub description: String,

    pub units: i32,
    pub unit_price: String,
    pub total_amount: String,

    pub insurance_estimated: Option<String>,
    pub patient_responsibility: Option<String>,

    pub status: BillingStatus,

    pub submitted_at: Option<Timestamp>,
    pub paid_at: Option<Timestamp>,

    pub claim_number: Option<String>,
    pub denial_reason: Option<String>,
    pub adjustment_reason: Option<String>,
    pub adjustment_amount: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub created_by: Id,

    pub revision: Option<String>,
}

impl BillingEntry {
    pub fn new(
        patient_id: Id,
        encounter_id: Id,
        provider_id: Id,
        cpt_code: String,
        description: String,
        unit_price: String,
        created_by: Id,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            patient_id,
            encounter_id,
            provider_id,
            cpt_code,
            icd10_codes: Vec::new(),
            description,
            units: 1,
            unit_price: unit_price.clone(),
            total_amount: unit_price,
            insurance_estimated: None,
            patient_responsibility: None,
            status: BillingStatus::Draft,
            submitted_at: None,
            paid_at: None,
            claim_number: None,
            denial_reason: None,
            adjustment_reason: None,
            adjustment_amount: None,
            created_at: now,
            updated_at: now,
            created_by,
            revision: None,
        }
    }

    pub fn submit(&mut self, claim_number: String) {
        let now = chrono::Utc::now();
        self.status = BillingStatus::Submitted;
        self.claim_number = Some(claim_number);
        self.submitted_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_paid(&mut self) {
        let now = chrono::Utc::now();
        self.status = BillingStatus::Paid;
        self.paid_at = Some(now);
        self.updated_at = now;
    }

    pub fn deny(&mut self, reason: String) {
        self.status = BillingStatus::Denied;
        self.denial_reason = Some(reason);
        self.updated_at = chrono::Utc::now();
    }
}
