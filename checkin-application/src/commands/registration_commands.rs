use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use checkin_domain::{
    Attendee, AttendeeId, CapacityGuard, Decision, Event, EventId, NewRegistration,
    Registration, RegistrationCode, RegistrationId, RegistrationStatus, Rejection, StoreError,
};

use crate::credentials::{
    CodeGenerator, CredentialPayload, CredentialPayloadBuilder, CredentialSigner,
};
use crate::dtos::{RegistrationReceipt, RegistrationRequest, RegistrationView};
use crate::ledger::CheckInLedger;
use crate::utils::storage_precision;
use crate::{AppError, AppState, EngineSettings};

/// Optimistic retries when a freshly drawn code loses an insert race.
const ADMISSION_ATTEMPTS: u32 = 3;

pub async fn register_attendee(
    state: &AppState,
    event_id: EventId,
    request: RegistrationRequest,
) -> Result<Decision<RegistrationReceipt>, AppError> {
    register_attendee_at(state, event_id, AttendeeId(request.attendee_id), Utc::now()).await
}

pub async fn register_attendee_at(
    state: &AppState,
    event_id: EventId,
    attendee_id: AttendeeId,
    now: DateTime<Utc>,
) -> Result<Decision<RegistrationReceipt>, AppError> {
    register_attendee_with(state, event_id, attendee_id, now, CodeGenerator::random_code).await
}

/// Registration with an explicit code source; `register_attendee_at` draws at random.
pub async fn register_attendee_with(
    state: &AppState,
    event_id: EventId,
    attendee_id: AttendeeId,
    now: DateTime<Utc>,
    mut draw: impl FnMut() -> RegistrationCode + Send,
) -> Result<Decision<RegistrationReceipt>, AppError> {
    let settings = EngineSettings::load(state.settings.as_ref())?;
    let event = load_event(state, event_id).await?;
    let attendee = load_attendee(state, attendee_id).await?;

    let guard = CapacityGuard::at(now);
    let generator = CodeGenerator::new(settings.code_attempts);
    let mut admitted = None;
    for attempt in 1..=ADMISSION_ATTEMPTS {
        let registration_code = generator
            .generate_with(state.registrations.as_ref(), &mut draw)
            .await?;
        let draft = NewRegistration {
            event_id,
            attendee_id,
            registration_code,
            // Confirmation is immediate on admission.
            status: RegistrationStatus::Confirmed,
            registration_date: storage_precision(now),
        };
        match state.registrations.admit(draft, &guard).await {
            Ok(Ok(registration)) => {
                admitted = Some(registration);
                break;
            }
            Ok(Err(rejection)) => {
                state.metrics.record_admission_rejection();
                debug!(event_id = %event_id, reason = rejection.code(), "admission rejected");
                return Ok(Err(rejection));
            }
            Err(StoreError::Conflict(detail)) => {
                warn!(event_id = %event_id, attempt, "admission conflict: {}", detail);
            }
            Err(err) => return Err(err.into()),
        }
    }
    let mut registration = admitted.ok_or_else(|| {
        AppError::StorageUnavailable(format!(
            "admission did not settle after {} attempts",
            ADMISSION_ATTEMPTS
        ))
    })?;

    let builder = payload_builder(state, &settings)?;
    let credential = issue_credential(state, &builder, &mut registration, &event, &attendee, now).await?;

    state.metrics.record_admission();
    info!(
        registration_id = %registration.id,
        event_id = %event_id,
        attendee_id = %attendee_id,
        "registration admitted"
    );
    state
        .notifier
        .spawn_notification(attendee, registration.clone());

    Ok(Ok(RegistrationReceipt {
        registration: RegistrationView::new(&registration, None),
        credential,
    }))
}

pub async fn cancel_registration(
    state: &AppState,
    registration_id: RegistrationId,
) -> Result<Decision<RegistrationView>, AppError> {
    let decision = CheckInLedger::from_state(state).cancel(registration_id).await?;
    if decision.is_ok() {
        state.render_cache.invalidate(registration_id).await;
    }
    Ok(decision.map(|registration| RegistrationView::new(&registration, None)))
}

/// Regenerates the payload with a fresh `issued_at`. The hash is unchanged.
pub async fn reissue_credential(
    state: &AppState,
    registration_id: RegistrationId,
) -> Result<Decision<CredentialPayload>, AppError> {
    let settings = EngineSettings::load(state.settings.as_ref())?;
    let Some(mut registration) = state.registrations.find_registration(registration_id).await? else {
        return Err(AppError::NotFound(format!("registration {}", registration_id)));
    };
    if !registration.is_confirmed() {
        return Ok(Err(Rejection::NotConfirmed {
            status: registration.status,
        }));
    }
    if let Some(existing) = state.check_ins.find_check_in(registration_id).await? {
        return Ok(Err(checkin_domain::already_checked_in(&existing)));
    }

    let event = load_event(state, registration.event_id).await?;
    let attendee = load_attendee(state, registration.attendee_id).await?;
    let builder = payload_builder(state, &settings)?;
    let credential = issue_credential(
        state,
        &builder,
        &mut registration,
        &event,
        &attendee,
        Utc::now(),
    )
    .await?;
    info!(registration_id = %registration_id, "credential re-issued");
    Ok(Ok(credential))
}

fn payload_builder(
    state: &AppState,
    settings: &EngineSettings,
) -> Result<CredentialPayloadBuilder, AppError> {
    Ok(CredentialPayloadBuilder::new(
        CredentialSigner::new(&settings.secret_key)?,
        &state.config.public_base_url,
        settings.validity_after_end,
    ))
}

async fn issue_credential(
    state: &AppState,
    builder: &CredentialPayloadBuilder,
    registration: &mut Registration,
    event: &Event,
    attendee: &Attendee,
    now: DateTime<Utc>,
) -> Result<CredentialPayload, AppError> {
    let issued = builder.build(registration, event, attendee, storage_precision(now))?;
    state
        .registrations
        .store_credential(registration.id, &issued.serialized, &issued.payload.security_hash)
        .await?;
    state.render_cache.invalidate(registration.id).await;

    registration.credential_payload = Some(issued.serialized);
    registration.security_hash = Some(issued.payload.security_hash.clone());
    Ok(issued.payload)
}

async fn load_event(state: &AppState, event_id: EventId) -> Result<Event, AppError> {
    state
        .events
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {}", event_id)))
}

async fn load_attendee(state: &AppState, attendee_id: AttendeeId) -> Result<Attendee, AppError> {
    state
        .events
        .find_attendee(attendee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("attendee {}", attendee_id)))
}
