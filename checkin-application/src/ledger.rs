// One registration, at most one check-in

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use checkin_domain::{
    already_checked_in, CheckIn, CheckInMethod, CheckInRepository, Decision, NewCheckIn,
    OperatorId, Registration, RegistrationId, RegistrationRepository, Rejection,
};

use crate::utils::{normalize_optional_text, storage_precision};
use crate::{AppError, AppState};

pub struct CheckInLedger {
    registrations: Arc<dyn RegistrationRepository>,
    check_ins: Arc<dyn CheckInRepository>,
}

impl CheckInLedger {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        check_ins: Arc<dyn CheckInRepository>,
    ) -> Self {
        Self {
            registrations,
            check_ins,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.registrations.clone(), state.check_ins.clone())
    }

    /// The pre-check only shapes a clean rejection; the store's uniqueness
    /// constraint decides races.
    pub async fn record_check_in(
        &self,
        registration: &Registration,
        method: CheckInMethod,
        operator_id: Option<OperatorId>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Decision<CheckIn>, AppError> {
        if let Some(existing) = self.check_ins.find_check_in(registration.id).await? {
            return Ok(Err(already_checked_in(&existing)));
        }

        let decision = self
            .check_ins
            .record(NewCheckIn {
                registration_id: registration.id,
                checked_in_at: storage_precision(now),
                method,
                operator_id,
                note: normalize_optional_text(note),
            })
            .await?;

        match &decision {
            Ok(check_in) => info!(
                registration_id = %registration.id,
                event_id = %registration.event_id,
                method = check_in.method.as_str(),
                "check-in recorded"
            ),
            Err(rejection) => debug!(
                registration_id = %registration.id,
                reason = rejection.code(),
                "check-in refused by ledger"
            ),
        }
        Ok(decision)
    }

    pub async fn find(&self, registration_id: RegistrationId) -> Result<Option<CheckIn>, AppError> {
        Ok(self.check_ins.find_check_in(registration_id).await?)
    }

    /// Flips status only; the registration row stays for audit.
    pub async fn cancel(&self, registration_id: RegistrationId) -> Result<Decision<Registration>, AppError> {
        let decision = self.registrations.cancel(registration_id).await?;
        match &decision {
            Ok(registration) => info!(
                registration_id = %registration.id,
                event_id = %registration.event_id,
                "registration cancelled"
            ),
            Err(Rejection::UnknownRegistration) => {
                return Err(AppError::NotFound(format!("registration {}", registration_id)));
            }
            Err(rejection) => debug!(
                registration_id = %registration_id,
                reason = rejection.code(),
                "cancellation refused"
            ),
        }
        Ok(decision)
    }
}
