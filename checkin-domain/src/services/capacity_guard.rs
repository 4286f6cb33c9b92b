// Admission control against an event's capacity

use chrono::{DateTime, Utc};

use crate::entities::AdmissionSnapshot;
use crate::errors::{Decision, Rejection};
use crate::ports::AdmissionPolicy;
use crate::value_objects::EventStatus;

#[derive(Debug, Clone, Copy)]
pub struct CapacityGuard {
    now: DateTime<Utc>,
}

impl CapacityGuard {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl AdmissionPolicy for CapacityGuard {
    fn evaluate(&self, snapshot: &AdmissionSnapshot) -> Decision<()> {
        let event = &snapshot.event;
        let already_registered = snapshot
            .existing
            .as_ref()
            .map(|registration| registration.status.is_active())
            .unwrap_or(false);
        if already_registered {
            return Err(Rejection::AlreadyRegistered);
        }
        if event.deadline_passed(self.now) {
            return Err(Rejection::DeadlinePassed);
        }
        if event.status != EventStatus::Published || event.has_started(self.now) {
            return Err(Rejection::EventNotOpen);
        }
        if event.is_full(snapshot.confirmed_count) {
            return Err(Rejection::EventFull);
        }
        Ok(())
    }
}
