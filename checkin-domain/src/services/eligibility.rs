// Time windows for credential redemption and expiry

use chrono::{DateTime, Duration, Utc};

use crate::entities::Event;
use crate::errors::{Decision, EligibilityIssue, Rejection};
use crate::value_objects::EventStatus;

pub const DEFAULT_EARLY_WINDOW_MINUTES: i64 = 120;
pub const DEFAULT_LATE_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_VALIDITY_AFTER_END_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionWindow {
    pub before_start: Duration,
    pub after_end: Duration,
}

impl Default for RedemptionWindow {
    fn default() -> Self {
        Self {
            before_start: Duration::minutes(DEFAULT_EARLY_WINDOW_MINUTES),
            after_end: Duration::hours(DEFAULT_LATE_WINDOW_HOURS),
        }
    }
}

impl RedemptionWindow {
    pub fn opens_at(&self, event: &Event) -> DateTime<Utc> {
        event.start_date - self.before_start
    }

    pub fn closes_at(&self, event: &Event) -> DateTime<Utc> {
        event.end_date + self.after_end
    }

    pub fn check(&self, event: &Event, now: DateTime<Utc>) -> Decision<()> {
        if event.status == EventStatus::Cancelled {
            return Err(Rejection::EventNotEligible(EligibilityIssue::EventCancelled));
        }
        let opens_at = self.opens_at(event);
        if now < opens_at {
            return Err(Rejection::EventNotEligible(EligibilityIssue::TooEarly {
                opens_at,
            }));
        }
        let closed_at = self.closes_at(event);
        if now > closed_at {
            return Err(Rejection::EventNotEligible(
                EligibilityIssue::WindowClosed { closed_at },
            ));
        }
        Ok(())
    }
}

/// Credentials stay usable for stragglers until `validity_after_end` past the event end.
pub fn credential_expiry(event: &Event, validity_after_end: Duration) -> DateTime<Utc> {
    event.end_date + validity_after_end
}

pub fn check_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Decision<()> {
    match expires_at {
        Some(expires_at) if now > expires_at => Err(Rejection::Expired { expires_at }),
        _ => Ok(()),
    }
}
