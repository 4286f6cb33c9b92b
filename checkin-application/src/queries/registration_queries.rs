use checkin_domain::{CheckIn, RegistrationId};

use crate::dtos::RegistrationView;
use crate::{AppError, AppState};

pub async fn get_registration(
    state: &AppState,
    registration_id: RegistrationId,
) -> Result<RegistrationView, AppError> {
    let registration = state
        .registrations
        .find_registration(registration_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("registration {}", registration_id)))?;
    let check_in = state.check_ins.find_check_in(registration_id).await?;
    Ok(RegistrationView::new(&registration, check_in))
}

pub async fn get_check_in(
    state: &AppState,
    registration_id: RegistrationId,
) -> Result<CheckIn, AppError> {
    state
        .check_ins
        .find_check_in(registration_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("check-in for registration {}", registration_id)))
}
