// In-process store for development and tests
// A single mutex serializes every mutation, which makes admit/record/cancel atomic

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use checkin_domain::{
    cancellation_decision, check_in_decision, AdmissionPolicy, AdmissionSnapshot, Attendee,
    AttendeeId, CheckIn, CheckInId, CheckInRepository, Decision, Event, EventId,
    EventRepository, NewCheckIn, NewRegistration, Registration, RegistrationCode,
    RegistrationId, RegistrationRepository, RegistrationStatus, Rejection, StoreError,
};

#[derive(Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    attendees: HashMap<AttendeeId, Attendee>,
    registrations: BTreeMap<RegistrationId, Registration>,
    check_ins: HashMap<RegistrationId, CheckIn>,
    next_registration_id: i64,
    next_check_in_id: i64,
}

impl Tables {
    fn confirmed_count(&self, event_id: EventId) -> u64 {
        self.registrations
            .values()
            .filter(|r| r.event_id == event_id && r.status == RegistrationStatus::Confirmed)
            .count() as u64
    }

    fn active_registration(&self, event_id: EventId, attendee_id: AttendeeId) -> Option<&Registration> {
        self.registrations
            .values()
            .find(|r| r.event_id == event_id && r.attendee_id == attendee_id && r.status.is_active())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events are owned by the organizer layer; this is how they get here.
    pub async fn upsert_event(&self, event: Event) {
        self.tables.lock().await.events.insert(event.id, event);
    }

    pub async fn upsert_attendee(&self, attendee: Attendee) {
        self.tables.lock().await.attendees.insert(attendee.id, attendee);
    }

    pub async fn check_in_count(&self) -> usize {
        self.tables.lock().await.check_ins.len()
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn find_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }

    async fn find_attendee(&self, id: AttendeeId) -> Result<Option<Attendee>, StoreError> {
        Ok(self.tables.lock().await.attendees.get(&id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl RegistrationRepository for MemoryStore {
    async fn code_exists(&self, code: &RegistrationCode) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .registrations
            .values()
            .any(|r| &r.registration_code == code))
    }

    async fn admit(
        &self,
        registration: NewRegistration,
        policy: &dyn AdmissionPolicy,
    ) -> Result<Decision<Registration>, StoreError> {
        let mut tables = self.tables.lock().await;

        let Some(event) = tables.events.get(&registration.event_id).cloned() else {
            return Ok(Err(Rejection::EventNotOpen));
        };
        let snapshot = AdmissionSnapshot {
            existing: tables
                .active_registration(registration.event_id, registration.attendee_id)
                .cloned(),
            confirmed_count: tables.confirmed_count(registration.event_id),
            event,
        };
        if let Err(rejection) = policy.evaluate(&snapshot) {
            return Ok(Err(rejection));
        }

        if tables
            .registrations
            .values()
            .any(|r| r.registration_code == registration.registration_code)
        {
            return Err(StoreError::Conflict(format!(
                "registration code {} already taken",
                registration.registration_code
            )));
        }

        tables.next_registration_id += 1;
        let stored = Registration {
            id: RegistrationId(tables.next_registration_id),
            event_id: registration.event_id,
            attendee_id: registration.attendee_id,
            registration_code: registration.registration_code,
            credential_payload: None,
            security_hash: None,
            status: registration.status,
            registration_date: registration.registration_date,
        };
        tables.registrations.insert(stored.id, stored.clone());
        Ok(Ok(stored))
    }

    async fn find_registration(&self, id: RegistrationId) -> Result<Option<Registration>, StoreError> {
        Ok(self.tables.lock().await.registrations.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &RegistrationCode) -> Result<Option<Registration>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .registrations
            .values()
            .find(|r| &r.registration_code == code)
            .cloned())
    }

    async fn confirmed_count(&self, event_id: EventId) -> Result<u64, StoreError> {
        Ok(self.tables.lock().await.confirmed_count(event_id))
    }

    async fn store_credential(
        &self,
        id: RegistrationId,
        payload: &str,
        security_hash: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let registration = tables
            .registrations
            .get_mut(&id)
            .ok_or_else(|| StoreError::unavailable(format!("registration {} vanished", id)))?;
        registration.credential_payload = Some(payload.to_string());
        registration.security_hash = Some(security_hash.to_string());
        Ok(())
    }

    async fn cancel(&self, id: RegistrationId) -> Result<Decision<Registration>, StoreError> {
        let mut tables = self.tables.lock().await;
        let existing = tables.check_ins.get(&id).cloned();
        let Some(registration) = tables.registrations.get_mut(&id) else {
            return Ok(Err(Rejection::UnknownRegistration));
        };
        if let Err(rejection) = cancellation_decision(registration, existing.as_ref()) {
            return Ok(Err(rejection));
        }
        registration.status = RegistrationStatus::Cancelled;
        Ok(Ok(registration.clone()))
    }
}

#[async_trait]
impl CheckInRepository for MemoryStore {
    async fn find_check_in(&self, registration_id: RegistrationId) -> Result<Option<CheckIn>, StoreError> {
        Ok(self.tables.lock().await.check_ins.get(&registration_id).cloned())
    }

    async fn record(&self, check_in: NewCheckIn) -> Result<Decision<CheckIn>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(registration) = tables.registrations.get(&check_in.registration_id) else {
            return Ok(Err(Rejection::UnknownRegistration));
        };
        let existing = tables.check_ins.get(&check_in.registration_id);
        if let Err(rejection) = check_in_decision(registration, existing) {
            return Ok(Err(rejection));
        }

        tables.next_check_in_id += 1;
        let stored = CheckIn {
            id: CheckInId(tables.next_check_in_id),
            registration_id: check_in.registration_id,
            checked_in_at: check_in.checked_in_at,
            method: check_in.method,
            operator_id: check_in.operator_id,
            note: check_in.note,
        };
        tables.check_ins.insert(stored.registration_id, stored.clone());
        Ok(Ok(stored))
    }
}
