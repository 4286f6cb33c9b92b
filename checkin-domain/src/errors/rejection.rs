// Typed rejections returned by admission, verification and the check-in ledger

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::value_objects::{OperatorId, RegistrationStatus};

/// Outcome of an engine decision: `Err` is an expected rejection, not a failure.
pub type Decision<T> = Result<T, Rejection>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionCategory {
    Input,
    Integrity,
    State,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EligibilityIssue {
    EventCancelled,
    TooEarly { opens_at: DateTime<Utc> },
    WindowClosed { closed_at: DateTime<Utc> },
}

impl fmt::Display for EligibilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EligibilityIssue::EventCancelled => f.write_str("event was cancelled"),
            EligibilityIssue::TooEarly { opens_at } => {
                write!(f, "check-in opens at {}", opens_at.to_rfc3339())
            }
            EligibilityIssue::WindowClosed { closed_at } => {
                write!(f, "check-in closed at {}", closed_at.to_rfc3339())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("unsupported credential version '{0}'")]
    UnsupportedVersion(String),
    #[error("unknown registration")]
    UnknownRegistration,
    #[error("credential integrity check failed")]
    TamperedPayload,
    #[error("credential expired at {}", expires_at.to_rfc3339())]
    Expired { expires_at: DateTime<Utc> },
    #[error("registration is {}", status.as_str())]
    NotConfirmed { status: RegistrationStatus },
    #[error("already checked in at {}", checked_in_at.to_rfc3339())]
    AlreadyCheckedIn {
        checked_in_at: DateTime<Utc>,
        operator_id: Option<OperatorId>,
    },
    #[error("event not eligible for check-in: {0}")]
    EventNotEligible(EligibilityIssue),
    #[error("attendee is already registered for this event")]
    AlreadyRegistered,
    #[error("registration deadline has passed")]
    DeadlinePassed,
    #[error("event is not open for registration")]
    EventNotOpen,
    #[error("event is full")]
    EventFull,
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Rejection::UnsupportedVersion(_) => "UNSUPPORTED_VERSION",
            Rejection::UnknownRegistration => "UNKNOWN_REGISTRATION",
            Rejection::TamperedPayload => "TAMPERED_PAYLOAD",
            Rejection::Expired { .. } => "EXPIRED",
            Rejection::NotConfirmed { .. } => "NOT_CONFIRMED",
            Rejection::AlreadyCheckedIn { .. } => "ALREADY_CHECKED_IN",
            Rejection::EventNotEligible(_) => "EVENT_NOT_ELIGIBLE",
            Rejection::AlreadyRegistered => "ALREADY_REGISTERED",
            Rejection::DeadlinePassed => "DEADLINE_PASSED",
            Rejection::EventNotOpen => "EVENT_NOT_OPEN",
            Rejection::EventFull => "EVENT_FULL",
        }
    }

    pub fn category(&self) -> RejectionCategory {
        match self {
            Rejection::MalformedPayload(_)
            | Rejection::UnsupportedVersion(_)
            | Rejection::UnknownRegistration => RejectionCategory::Input,
            Rejection::TamperedPayload => RejectionCategory::Integrity,
            _ => RejectionCategory::State,
        }
    }

    /// Message safe to show to staff. Integrity failures collapse to a generic text.
    pub fn public_message(&self) -> String {
        match self.category() {
            RejectionCategory::Integrity => "invalid credential".to_string(),
            _ => self.to_string(),
        }
    }
}
