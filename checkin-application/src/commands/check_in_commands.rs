use chrono::{DateTime, Utc};

use checkin_domain::{Decision, OperatorId, RegistrationId, Rejection};

use crate::credentials::{CredentialVerifier, PresentedCredential, ValidatedRegistration};
use crate::dtos::{CheckInReceipt, CheckInRequest, ManualCheckInRequest, VerificationSummary};
use crate::ledger::CheckInLedger;
use crate::{AppError, AppState};

pub async fn check_in(
    state: &AppState,
    request: CheckInRequest,
) -> Result<Decision<CheckInReceipt>, AppError> {
    let presented = request.credential.into_presented()?;
    check_in_at(
        state,
        &presented,
        request.operator_id.map(OperatorId),
        request.note,
        Utc::now(),
    )
    .await
}

/// Verify, then record with the method implied by the presented credential.
pub async fn check_in_at(
    state: &AppState,
    presented: &PresentedCredential,
    operator_id: Option<OperatorId>,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Decision<CheckInReceipt>, AppError> {
    let verifier = CredentialVerifier::from_state(state)?;
    let validated = match verifier.verify_at(presented, now).await? {
        Ok(validated) => validated,
        Err(rejection) => return Ok(Err(reject(state, rejection))),
    };
    record(state, validated, operator_id, note, now).await
}

pub async fn manual_check_in(
    state: &AppState,
    request: ManualCheckInRequest,
) -> Result<Decision<CheckInReceipt>, AppError> {
    manual_check_in_at(
        state,
        RegistrationId(request.registration_id),
        OperatorId(request.operator_id),
        request.note,
        Utc::now(),
    )
    .await
}

/// Operator looked the attendee up by registration id; no credential is presented.
pub async fn manual_check_in_at(
    state: &AppState,
    registration_id: RegistrationId,
    operator_id: OperatorId,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Decision<CheckInReceipt>, AppError> {
    let verifier = CredentialVerifier::from_state(state)?;
    let validated = match verifier.verify_registration_at(registration_id, now).await? {
        Ok(validated) => validated,
        Err(rejection) => return Ok(Err(reject(state, rejection))),
    };
    record(state, validated, Some(operator_id), note, now).await
}

async fn record(
    state: &AppState,
    validated: ValidatedRegistration,
    operator_id: Option<OperatorId>,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Decision<CheckInReceipt>, AppError> {
    let decision = CheckInLedger::from_state(state)
        .record_check_in(&validated.registration, validated.method, operator_id, note, now)
        .await?;
    match decision {
        Ok(check_in) => {
            state.metrics.record_check_in();
            Ok(Ok(CheckInReceipt {
                check_in,
                registration: VerificationSummary::from(&validated),
            }))
        }
        Err(rejection) => Ok(Err(reject(state, rejection))),
    }
}

fn reject(state: &AppState, rejection: Rejection) -> Rejection {
    state
        .metrics
        .record_verification_rejection(matches!(rejection, Rejection::TamperedPayload));
    rejection
}
