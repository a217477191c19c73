//! Facility records: departments, rooms, and registered devices.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{DeviceType, Id, RoomType, Timestamp};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Department {
    pub id: Id,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    pub description: Option<String>,
    /// Parent department for hierarchy.
    pub parent_id: Option<Id>,
    pub manager_id: Option<Id>,
    pub active: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    pub revision: Option<String>,
}

impl Department {
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            name,
            description: None,
            parent_id: None,
            manager_id: None,
            active: true,
            created_at: now,
            updated_at: now,
            revision: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Room {
    pub id: Id,

    #[validate(length(min = 1, max = 50))]
    pub name: String,

    #[validate(length(max = 20))]
    pub room_number: String,

    pub department_id: Option<Id>,
    pub room_type: RoomType,
    pub capacity: i32,
    pub equipment: Vec<String>,
    pub active: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    pub revision: Option<String>,
}

impl Room {
    pub fn new(name: String, room_number: String, room_type: RoomType) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            name,
            room_number,
            department_id: None,
            room_type,
            capacity: 1,
            equipment: Vec::new(),
            active: true,
            created_at: now,
            updated_at: now,
            revision: None,
        }
    }
}

/// A device registered to run this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Id,
    pub user_id: Id,

    pub device_type: DeviceType,
    pub device_name: Option<String>,

    pub last_sync_at: Option<Timestamp>,

    pub revoked: bool,
    pub revoked_at: Option<Timestamp>,
    pub revoked_by: Option<Id>,

    pub created_at: Timestamp,

    pub revision: Option<String>,
}

impl Device {
    pub fn new(user_id: Id, device_type: DeviceType, device_name: Option<String>) -> Self {
        Self {
            id: Id::new_v4(),
            user_id,
            device_type,
            device_name,
            last_sync_at: None,
            revoked: false,
            revoked_at: None,
            revoked_by: None,
            created_at: chrono::Utc::now(),
            revision: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.revoked
    }

    pub fn revoke(&mut self, revoked_by: Id) {
        self.revoked = true;
        self.revoked_at = Some(chrono::Utc::now());
        self.revoked_by = Some(revoked_by);
    }
}
