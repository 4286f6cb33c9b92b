// Attendee as seen by the engine: identity and display name only

use serde::{Deserialize, Serialize};

use crate::value_objects::AttendeeId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub id: AttendeeId,
    pub name: String,
    pub email: Option<String>,
}
