// Event entity
// Owned by the organizer CRUD layer; read-only here except for capacity counting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{EventId, EventStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub venue: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// `None` means unlimited.
    pub max_capacity: Option<u32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub status: EventStatus,
}

impl Event {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_date
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.registration_deadline
            .map(|deadline| now > deadline)
            .unwrap_or(false)
    }

    pub fn is_full(&self, confirmed: u64) -> bool {
        self.max_capacity
            .map(|capacity| confirmed >= u64::from(capacity))
            .unwrap_or(false)
    }
}
