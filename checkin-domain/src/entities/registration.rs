// Registration entity
// One attendee's claim on one event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::Event;
use crate::value_objects::{AttendeeId, EventId, RegistrationCode, RegistrationId, RegistrationStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub event_id: EventId,
    pub attendee_id: AttendeeId,
    pub registration_code: RegistrationCode,
    /// Serialized signed credential; `None` until issued.
    pub credential_payload: Option<String>,
    pub security_hash: Option<String>,
    pub status: RegistrationStatus,
    pub registration_date: DateTime<Utc>,
}

impl Registration {
    pub fn is_confirmed(&self) -> bool {
        self.status == RegistrationStatus::Confirmed
    }
}

/// Fields supplied by the admission flow; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub event_id: EventId,
    pub attendee_id: AttendeeId,
    pub registration_code: RegistrationCode,
    pub status: RegistrationStatus,
    pub registration_date: DateTime<Utc>,
}

/// What the store observed for an event inside its admission critical section.
#[derive(Debug, Clone)]
pub struct AdmissionSnapshot {
    pub event: Event,
    pub existing: Option<Registration>,
    pub confirmed_count: u64,
}
