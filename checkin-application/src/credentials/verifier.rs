use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use checkin_domain::{
    check_expiry, check_in_decision, credential_expiry, Attendee, CheckInMethod,
    CheckInRepository, Decision, Event, EventRepository, RedemptionWindow, Registration,
    RegistrationCode, RegistrationId, RegistrationRepository, Rejection,
};

use super::payload::{decode_presented, PresentedPayload};
use super::signer::{CredentialSigner, SignedFields};
use crate::{AppError, AppState, EngineSettings};

/// What staff hand to the verifier: a scanned payload or a typed code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentedCredential {
    Payload(String),
    Code(String),
}

impl PresentedCredential {
    /// Scanners forward whatever they read; JSON objects are payloads, anything else a code.
    pub fn detect(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            PresentedCredential::Payload(trimmed.to_string())
        } else {
            PresentedCredential::Code(trimmed.to_string())
        }
    }

    pub fn method(&self) -> CheckInMethod {
        match self {
            PresentedCredential::Payload(_) => CheckInMethod::ScannedCode,
            PresentedCredential::Code(_) => CheckInMethod::ManualCode,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedRegistration {
    pub registration: Registration,
    pub event: Event,
    pub attendee: Option<Attendee>,
    pub method: CheckInMethod,
    pub credential_version: Option<String>,
}

/// Legacy payloads carry no expiry and never expire; typed codes expire with their event.
enum Expiry {
    Presented(Option<DateTime<Utc>>),
    FromEvent,
}

pub struct CredentialVerifier {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    check_ins: Arc<dyn CheckInRepository>,
    signer: CredentialSigner,
    window: RedemptionWindow,
    validity_after_end: Duration,
}

impl CredentialVerifier {
    pub fn new(
        events: Arc<dyn EventRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        check_ins: Arc<dyn CheckInRepository>,
        signer: CredentialSigner,
        window: RedemptionWindow,
        validity_after_end: Duration,
    ) -> Self {
        Self {
            events,
            registrations,
            check_ins,
            signer,
            window,
            validity_after_end,
        }
    }

    pub fn from_state(state: &AppState) -> Result<Self, AppError> {
        let settings = EngineSettings::load(state.settings.as_ref())?;
        Ok(Self::new(
            state.events.clone(),
            state.registrations.clone(),
            state.check_ins.clone(),
            CredentialSigner::new(&settings.secret_key)?,
            settings.window,
            settings.validity_after_end,
        ))
    }

    pub async fn verify(
        &self,
        presented: &PresentedCredential,
    ) -> Result<Decision<ValidatedRegistration>, AppError> {
        self.verify_at(presented, Utc::now()).await
    }

    pub async fn verify_at(
        &self,
        presented: &PresentedCredential,
        now: DateTime<Utc>,
    ) -> Result<Decision<ValidatedRegistration>, AppError> {
        match presented {
            PresentedCredential::Payload(raw) => self.verify_payload_at(raw, now).await,
            PresentedCredential::Code(raw) => self.verify_code_at(raw, now).await,
        }
    }

    async fn verify_payload_at(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision<ValidatedRegistration>, AppError> {
        let presented = match decode_presented(raw) {
            Ok(presented) => presented,
            Err(rejection) => return Ok(Err(rejection)),
        };

        let registration = match self
            .registrations
            .find_registration(presented.registration_id)
            .await?
        {
            Some(registration)
                if registration.registration_code.as_str() == presented.registration_code =>
            {
                registration
            }
            _ => return Ok(Err(Rejection::UnknownRegistration)),
        };

        if !self.claims_are_authentic(&presented, &registration) {
            warn!(
                registration_id = %registration.id,
                event_id = %registration.event_id,
                attendee_id = %registration.attendee_id,
                claimed_event_id = %presented.event_id,
                claimed_attendee_id = %presented.attendee_id,
                version = presented.version(),
                "credential integrity check failed"
            );
            return Ok(Err(Rejection::TamperedPayload));
        }

        let version = presented.version().to_string();
        let decision = self
            .check_state(
                registration,
                Expiry::Presented(presented.expires_at),
                CheckInMethod::ScannedCode,
                now,
            )
            .await?;
        Ok(decision.map(|mut validated| {
            validated.credential_version = Some(version);
            validated
        }))
    }

    async fn verify_code_at(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision<ValidatedRegistration>, AppError> {
        let Some(code) = RegistrationCode::parse(raw) else {
            return Ok(Err(Rejection::MalformedPayload(
                "registration code must be 8 characters from A-Z and 0-9".to_string(),
            )));
        };
        let Some(registration) = self.registrations.find_by_code(&code).await? else {
            return Ok(Err(Rejection::UnknownRegistration));
        };
        self.check_state(registration, Expiry::FromEvent, CheckInMethod::ManualCode, now)
            .await
    }

    /// Operator-driven lookup by registration id; runs the state checks only.
    pub async fn verify_registration_at(
        &self,
        registration_id: RegistrationId,
        now: DateTime<Utc>,
    ) -> Result<Decision<ValidatedRegistration>, AppError> {
        let Some(registration) = self.registrations.find_registration(registration_id).await? else {
            return Ok(Err(Rejection::UnknownRegistration));
        };
        self.check_state(registration, Expiry::FromEvent, CheckInMethod::ManualId, now)
            .await
    }

    fn claims_are_authentic(&self, presented: &PresentedPayload, registration: &Registration) -> bool {
        let claimed = SignedFields {
            registration_id: presented.registration_id,
            registration_code: &presented.registration_code,
            event_id: presented.event_id,
            attendee_id: presented.attendee_id,
            registered_at: registration.registration_date,
        };
        self.signer.verify(&presented.security_hash, &claimed)
            && presented.event_id == registration.event_id
            && presented.attendee_id == registration.attendee_id
    }

    async fn check_state(
        &self,
        registration: Registration,
        expiry: Expiry,
        method: CheckInMethod,
        now: DateTime<Utc>,
    ) -> Result<Decision<ValidatedRegistration>, AppError> {
        let Some(event) = self.events.find_event(registration.event_id).await? else {
            warn!(registration_id = %registration.id, "registration references a missing event");
            return Ok(Err(Rejection::UnknownRegistration));
        };
        let expires_at = match expiry {
            // expires_at is outside the signed fields; never extend past the event-derived bound
            Expiry::Presented(Some(presented)) => {
                Some(presented.min(credential_expiry(&event, self.validity_after_end)))
            }
            Expiry::Presented(None) => None,
            Expiry::FromEvent => Some(credential_expiry(&event, self.validity_after_end)),
        };
        self.finish(registration, event, expires_at, method, now)
            .await
    }

    /// Expiry, status, prior check-in, then the event's redemption window.
    async fn finish(
        &self,
        registration: Registration,
        event: Event,
        expires_at: Option<DateTime<Utc>>,
        method: CheckInMethod,
        now: DateTime<Utc>,
    ) -> Result<Decision<ValidatedRegistration>, AppError> {
        if let Err(rejection) = check_expiry(expires_at, now) {
            return Ok(Err(rejection));
        }
        let existing = self.check_ins.find_check_in(registration.id).await?;
        if let Err(rejection) = check_in_decision(&registration, existing.as_ref()) {
            debug!(registration_id = %registration.id, reason = rejection.code(), "credential rejected");
            return Ok(Err(rejection));
        }
        if let Err(rejection) = self.window.check(&event, now) {
            debug!(event_id = %event.id, reason = rejection.code(), "event outside redemption window");
            return Ok(Err(rejection));
        }

        let attendee = self.events.find_attendee(registration.attendee_id).await?;
        Ok(Ok(ValidatedRegistration {
            registration,
            event,
            attendee,
            method,
            credential_version: None,
        }))
    }
}
