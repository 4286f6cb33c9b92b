// CheckIn entity
// Created once per registration, never updated or deleted

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{CheckInId, CheckInMethod, OperatorId, RegistrationId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub registration_id: RegistrationId,
    pub checked_in_at: DateTime<Utc>,
    pub method: CheckInMethod,
    pub operator_id: Option<OperatorId>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub registration_id: RegistrationId,
    pub checked_in_at: DateTime<Utc>,
    pub method: CheckInMethod,
    pub operator_id: Option<OperatorId>,
    pub note: Option<String>,
}
