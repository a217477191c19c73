//! Appointment record.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{AppointmentStatus, AppointmentType, Id, Timestamp};

/// Appointment entity for scheduling. Stored unsealed — scheduling data
/// is queried heavily and carries no clinical free text.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Appointment {
    pub id: Id,
    pub patient_id: Id,
    pub provider_id: Id,
    pub room_id: Option<Id>,

    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Duration in minutes.
    pub duration: i32,

    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,

    pub cancellation_reason: Option<String>,

    #[validate(length(min = 1, max = 500))]
    pub reason_for_visit: String,

    pub check_in_time: Option<Timestamp>,
    pub check_out_time: Option<Timestamp>,
    /// Minutes between check-in and being roomed.
    pub wait_time: Option<i32>,

    pub notes: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub created_by: Id,

    pub revision: Option<String>,
    pub last_modified_by: Option<String>,
}

impl Appointment {
    pub fn new(
        patient_id: Id,
        provider_id: Id,
        start_time: Timestamp,
        duration: i32,
        appointment_type: AppointmentType,
        reason_for_visit: String,
        created_by: Id,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            patient_id,
            provider_id,
            room_id: None,
            start_time,
            end_time: start_time + chrono::Duration::minutes(duration as i64),
            duration,
            appointment_type,
            status: AppointmentStatus::Scheduled,
            cancellation_reason: None,
            reason_for_visit,
            check_in_time: None,
            check_out_time: None,
            wait_time: None,
            notes: None,
            created_at: now,
            updated_at: now,
            created_by,
            revision: None,
            last_modified_by: None,
        }
    }

    /// True if this appointment overlaps the given time range.
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        self.start_time < end && self.end_time > start
    }

    pub fn check_in(&mut self) {
        let now = chrono::Utc::now();
        self.check_in_time = Some(now);
        self.status = AppointmentStatus::CheckedIn;
        self.updated_at = now;
    }

    pub fn move_to_room(&mut self, room_id: Id) {
        let now = chrono::Utc::now();
        self.room_id = Some(room_id);
        self.status = AppointmentStatus::InRoom;
        if let Some(check_in) = self.check_in_time {
            self.wait_time = Some((now - check_in).num_minutes() as i32);
        }
        self.updated_at = now;
    }

    pub fn complete(&mut self) {
        let now = chrono::Utc::now();
        self.check_out_time = Some(now);
        self.status = AppointmentStatus::Completed;
        self.updated_at = now;
    }

    pub fn cancel(&mut self, reason: Option<String>) {
        self.status = AppointmentStatus::Cancelled;
        self.cancellation_reason = reason;
        self.updated_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_detection() {
        let start = chrono::Utc::now();
        let appt = Appointment::new(
            Id::new_v4(),
            Id::new_v4(),
            start,
            30,
            AppointmentType::FollowUp,
            "follow-up".into(),
            Id::new_v4(),
        );
        assert!(appt.overlaps(start + chrono::Duration::minutes(15), start + chrono::Duration::minutes(45)));
        assert!(!appt.overlaps(start + chrono::Duration::minutes(30), start + chrono::Duration::minutes(60)));
    }
}
