// Registration state machine guards shared by every store implementation

use crate::entities::{CheckIn, Registration};
use crate::errors::{Decision, Rejection};
use crate::value_objects::RegistrationStatus;

pub fn already_checked_in(check_in: &CheckIn) -> Rejection {
    Rejection::AlreadyCheckedIn {
        checked_in_at: check_in.checked_in_at,
        operator_id: check_in.operator_id,
    }
}

/// Only confirmed registrations without a prior check-in can be redeemed.
pub fn check_in_decision(registration: &Registration, existing: Option<&CheckIn>) -> Decision<()> {
    if !registration.is_confirmed() {
        return Err(Rejection::NotConfirmed {
            status: registration.status,
        });
    }
    if let Some(check_in) = existing {
        return Err(already_checked_in(check_in));
    }
    Ok(())
}

/// `pending | confirmed -> cancelled`, guarded by "no check-in exists".
pub fn cancellation_decision(
    registration: &Registration,
    existing: Option<&CheckIn>,
) -> Decision<()> {
    if let Some(check_in) = existing {
        return Err(already_checked_in(check_in));
    }
    match registration.status {
        RegistrationStatus::Pending | RegistrationStatus::Confirmed => Ok(()),
        RegistrationStatus::Cancelled => Err(Rejection::NotConfirmed {
            status: RegistrationStatus::Cancelled,
        }),
    }
}
