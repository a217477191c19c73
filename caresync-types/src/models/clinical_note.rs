//! Clinical note record with SOAP structure and signing lifecycle.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{Id, NoteStatus, NoteType, SignatureData, Timestamp};

/// Clinical note entity — sealed at rest. Note content and SOAP sections
/// are clinical free text and must never appear in the index whitelist.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClinicalNote {
    pub id: Id,
    pub patient_id: Id,
    pub author_id: Id,
    pub encounter_id: Option<Id>,

    pub note_type: NoteType,
    pub content: String,

    pub subjective: Option<SoapSection>,
    pub objective: Option<SoapSection>,
    pub assessment: Option<SoapSection>,
    pub plan: Option<SoapSection>,

    pub signature: Option<SignatureData>,
    pub co_signer_id: Option<Id>,
    pub co_signature: Option<SignatureData>,

    pub status: NoteStatus,
    /// Previous version id when this note amends another.
    pub amends_note_id: Option<Id>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub signed_at: Option<Timestamp>,

    pub revision: Option<String>,
    pub last_modified_by: Option<String>,
}

/// SOAP section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SoapSection {
    pub content: String,
    pub items: Vec<SoapItem>,
}

/// Individual coded item in a SOAP section (ICD-10, CPT, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoapItem {
    pub id: Id,
    pub text: String,
    pub code: Option<String>,
    pub order: i32,
}

impl ClinicalNote {
    pub fn new(patient_id: Id, author_id: Id, note_type: NoteType) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            patient_id,
            author_id,
            encounter_id: None,
            note_type,
            content: String::new(),
            subjective: None,
            objective: None,
            assessment: None,
            plan: None,
            signature: None,
            co_signer_id: None,
            co_signature: None,
            status: NoteStatus::Draft,
            amends_note_id: None,
            created_at: now,
            updated_at: now,
            signed_at: None,
            revision: None,
            last_modified_by: None,
        }
    }

    /// Signs a draft note; signing any other status is an error.
    pub fn sign(&mut self, signer_id: Id, signature_data: String) -> Result<(), &'static str> {
        if self.status != NoteStatus::Draft {
            return Err("only draft notes can be signed");
        }
        let now = chrono::Utc::now();
        self.signature = Some(SignatureData {
            signature_data,
            signed_at: now,
            signer_id,
        });
        self.status = NoteStatus::Signed;
        self.signed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Adds a supervising co-signature to an already signed note.
    pub fn co_sign(&mut self, co_signer_id: Id, signature_data: String) -> Result<(), &'static str> {
        if self.status != NoteStatus::Signed {
            return Err("note must be signed before co-signing");
        }
        let now = chrono::Utc::now();
        self.co_signer_id = Some(co_signer_id);
        self.co_signature = Some(SignatureData {
            signature_data,
            signed_at: now,
            signer_id: co_signer_id,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Produces a fresh draft amendment referencing this note.
    pub fn amend(&self, author_id: Id) -> ClinicalNote {
        let now = chrono::Utc::now();
        let mut amended = self.clone();
        amended.id = Id::new_v4();
        amended.amends_note_id = Some(self.id);
        amended.status = NoteStatus::Draft;
        amended.signature = None;
        amended.co_signer_id = None;
        amended.co_signature = None;
        amended.signed_at = None;
        amended.author_id = author_id;
        amended.created_at = now;
        amended.updated_at = now;
        amended
    }

    pub fn void(&mut self) -> Result<(), &'static str> {
        if self.status == NoteStatus::Voided {
            return Err("note already voided");
        }
        self.status = NoteStatus::Voided;
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.status, NoteStatus::Signed | NoteStatus::Amended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_void_lifecycle() {
        let mut note = ClinicalNote::new(Id::new_v4(), Id::new_v4(), NoteType::ProgressNote);
        assert!(note.sign(Id::new_v4(), "sig".into()).is_ok());
        assert!(note.is_signed());
        // Draft-only transition
        assert!(note.sign(Id::new_v4(), "sig2".into()).is_err());
        assert!(note.void().is_ok());
        assert!(note.void().is_err());
    }

    #[test]
    fn amendment_references_original() {
        let mut note = ClinicalNote::new(Id::new_v4(), Id::new_v4(), NoteType::Consultation);
        note.sign(Id::new_v4(), "sig".into()).unwrap();
        let amended = note.amend(Id::new_v4());
        assert_eq!(amended.amends_note_id, Some(note.id));
        assert_eq!(amended.status, NoteStatus::Draft);
        assert!(amended.signature.is_none());
    }
}
