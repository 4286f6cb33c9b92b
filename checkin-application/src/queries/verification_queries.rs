use chrono::{DateTime, Utc};

use checkin_domain::{Decision, Rejection};

use crate::credentials::{CredentialVerifier, PresentedCredential};
use crate::dtos::{CredentialInput, VerificationSummary};
use crate::{AppError, AppState};

/// Dry run: all checks, nothing recorded.
pub async fn verify_credential(
    state: &AppState,
    input: CredentialInput,
) -> Result<Decision<VerificationSummary>, AppError> {
    let presented = input.into_presented()?;
    verify_credential_at(state, &presented, Utc::now()).await
}

pub async fn verify_credential_at(
    state: &AppState,
    presented: &PresentedCredential,
    now: DateTime<Utc>,
) -> Result<Decision<VerificationSummary>, AppError> {
    let verifier = CredentialVerifier::from_state(state)?;
    let decision = verifier.verify_at(presented, now).await?;
    if let Err(rejection) = &decision {
        state
            .metrics
            .record_verification_rejection(matches!(rejection, Rejection::TamperedPayload));
    }
    Ok(decision.map(|validated| VerificationSummary::from(&validated)))
}
