use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use checkin_domain::{
    credential_expiry, Attendee, AttendeeId, Decision, Event, EventId, Registration,
    RegistrationId, Rejection,
};

use super::signer::{CredentialSigner, SignedFields};
use crate::AppError;

pub const CREDENTIAL_TYPE: &str = "event_registration_credential";
pub const CURRENT_VERSION: &str = "2.0";
pub const LEGACY_VERSION: &str = "1.0";
pub const SUPPORTED_VERSIONS: [&str; 2] = [CURRENT_VERSION, LEGACY_VERSION];

const CORE_FIELDS: [&str; 5] = [
    "registration_id",
    "registration_code",
    "event_id",
    "attendee_id",
    "security_hash",
];

const CURRENT_FIELDS: [&str; 7] = [
    "type",
    "version",
    "event_title",
    "attendee_name",
    "issued_at",
    "expires_at",
    "verification_url",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialPayload {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub version: String,
    pub registration_id: RegistrationId,
    pub registration_code: String,
    pub event_id: EventId,
    pub attendee_id: AttendeeId,
    pub event_title: String,
    pub attendee_name: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub security_hash: String,
    pub verification_url: String,
}

/// A credential as presented at the door, before any trust is placed in it.
#[derive(Debug, Clone, Deserialize)]
pub struct PresentedPayload {
    #[serde(rename = "type", default)]
    pub credential_type: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub registration_id: RegistrationId,
    pub registration_code: String,
    pub event_id: EventId,
    pub attendee_id: AttendeeId,
    pub security_hash: String,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PresentedPayload {
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(LEGACY_VERSION)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub payload: CredentialPayload,
    pub serialized: String,
}

#[derive(Debug, Clone)]
pub struct CredentialPayloadBuilder {
    signer: CredentialSigner,
    public_base_url: String,
    validity_after_end: Duration,
}

impl CredentialPayloadBuilder {
    pub fn new(signer: CredentialSigner, public_base_url: &str, validity_after_end: Duration) -> Self {
        Self {
            signer,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            validity_after_end,
        }
    }

    pub fn verification_url(&self, registration: &Registration) -> String {
        format!(
            "{}/v1/check-ins/verify?code={}",
            self.public_base_url, registration.registration_code
        )
    }

    pub fn build(
        &self,
        registration: &Registration,
        event: &Event,
        attendee: &Attendee,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedCredential, AppError> {
        let security_hash = self.signer.sign(&SignedFields::of(registration))?;
        let payload = CredentialPayload {
            credential_type: CREDENTIAL_TYPE.to_string(),
            version: CURRENT_VERSION.to_string(),
            registration_id: registration.id,
            registration_code: registration.registration_code.to_string(),
            event_id: registration.event_id,
            attendee_id: registration.attendee_id,
            event_title: event.title.clone(),
            attendee_name: attendee.name.clone(),
            issued_at,
            expires_at: credential_expiry(event, self.validity_after_end),
            security_hash,
            verification_url: self.verification_url(registration),
        };
        let serialized = serde_json::to_string(&payload)
            .map_err(|err| AppError::Internal(anyhow::anyhow!("serialize credential: {err}")))?;
        Ok(IssuedCredential {
            payload,
            serialized,
        })
    }
}

/// Structural checks: parse, required fields for the declared version, then type and version.
pub fn decode_presented(raw: &str) -> Decision<PresentedPayload> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|err| Rejection::MalformedPayload(format!("not valid JSON: {err}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| Rejection::MalformedPayload("expected a JSON object".to_string()))?;

    let version = match object.get("version") {
        None | Some(Value::Null) => LEGACY_VERSION.to_string(),
        Some(Value::String(version)) => version.trim().to_string(),
        Some(_) => {
            return Err(Rejection::MalformedPayload(
                "version must be a string".to_string(),
            ))
        }
    };

    let mut required: Vec<&str> = CORE_FIELDS.to_vec();
    if version == CURRENT_VERSION {
        required.extend(CURRENT_FIELDS);
    }
    let missing: Vec<&str> = required
        .into_iter()
        .filter(|field| object.get(*field).map(Value::is_null).unwrap_or(true))
        .collect();
    if !missing.is_empty() {
        return Err(Rejection::MalformedPayload(format!(
            "missing field(s): {}",
            missing.join(", ")
        )));
    }

    if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
        return Err(Rejection::UnsupportedVersion(version));
    }
    if let Some(credential_type) = object.get("type").and_then(Value::as_str) {
        if credential_type != CREDENTIAL_TYPE {
            return Err(Rejection::MalformedPayload(format!(
                "unexpected credential type '{}'",
                credential_type
            )));
        }
    }

    serde_json::from_value(value)
        .map_err(|err| Rejection::MalformedPayload(format!("invalid field: {err}")))
}
