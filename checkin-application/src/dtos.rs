// Request and response shapes shared with the HTTP layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use checkin_domain::{
    AttendeeId, CheckIn, CheckInMethod, EventId, Registration, RegistrationId, RegistrationStatus,
};

use crate::credentials::{CredentialPayload, PresentedCredential, ValidatedRegistration};
use crate::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub attendee_id: i64,
}

/// Either a scanned payload (JSON object or its string form), a typed code,
/// or raw scanner output to classify.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialInput {
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub scanned: Option<String>,
}

impl CredentialInput {
    pub fn into_presented(self) -> Result<PresentedCredential, AppError> {
        match (self.payload, self.code, self.scanned) {
            (Some(Value::String(raw)), None, None) => Ok(PresentedCredential::Payload(raw)),
            (Some(value), None, None) if !value.is_null() => {
                Ok(PresentedCredential::Payload(value.to_string()))
            }
            (None, Some(code), None) => Ok(PresentedCredential::Code(code)),
            (None, None, Some(raw)) => Ok(PresentedCredential::detect(&raw)),
            _ => Err(AppError::BadRequest(
                "exactly one of payload, code or scanned is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInRequest {
    #[serde(flatten)]
    pub credential: CredentialInput,
    #[serde(default)]
    pub operator_id: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualCheckInRequest {
    pub registration_id: i64,
    pub operator_id: i64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialImageQuery {
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationView {
    pub id: RegistrationId,
    pub event_id: EventId,
    pub attendee_id: AttendeeId,
    pub registration_code: String,
    pub status: RegistrationStatus,
    pub registration_date: DateTime<Utc>,
    pub credential_issued: bool,
    pub check_in: Option<CheckIn>,
}

impl RegistrationView {
    pub fn new(registration: &Registration, check_in: Option<CheckIn>) -> Self {
        Self {
            id: registration.id,
            event_id: registration.event_id,
            attendee_id: registration.attendee_id,
            registration_code: registration.registration_code.to_string(),
            status: registration.status,
            registration_date: registration.registration_date,
            credential_issued: registration.credential_payload.is_some(),
            check_in,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationReceipt {
    pub registration: RegistrationView,
    pub credential: CredentialPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationSummary {
    pub registration_id: RegistrationId,
    pub registration_code: String,
    pub event_id: EventId,
    pub event_title: String,
    pub attendee_id: AttendeeId,
    pub attendee_name: Option<String>,
    pub method: CheckInMethod,
    pub credential_version: Option<String>,
}

impl From<&ValidatedRegistration> for VerificationSummary {
    fn from(validated: &ValidatedRegistration) -> Self {
        Self {
            registration_id: validated.registration.id,
            registration_code: validated.registration.registration_code.to_string(),
            event_id: validated.event.id,
            event_title: validated.event.title.clone(),
            attendee_id: validated.registration.attendee_id,
            attendee_name: validated.attendee.as_ref().map(|attendee| attendee.name.clone()),
            method: validated.method,
            credential_version: validated.credential_version.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInReceipt {
    pub check_in: CheckIn,
    pub registration: VerificationSummary,
}
