use async_trait::async_trait;

use crate::entities::{
    AdmissionSnapshot,
    Attendee,
    CheckIn,
    Event,
    NewCheckIn,
    NewRegistration,
    Registration,
};
use crate::errors::{Decision, StoreError};
use crate::value_objects::{AttendeeId, EventId, RegistrationCode, RegistrationId};

/// Decides admission from a snapshot taken inside the store's critical section.
pub trait AdmissionPolicy: Send + Sync {
    fn evaluate(&self, snapshot: &AdmissionSnapshot) -> Decision<()>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_event(&self, id: EventId) -> Result<Option<Event>, StoreError>;
    async fn find_attendee(&self, id: AttendeeId) -> Result<Option<Attendee>, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn code_exists(&self, code: &RegistrationCode) -> Result<bool, StoreError>;

    /// Counts, evaluates `policy` and inserts atomically with respect to other
    /// admissions for the same event. A racing duplicate code surfaces as
    /// `StoreError::Conflict`.
    async fn admit(
        &self,
        registration: NewRegistration,
        policy: &dyn AdmissionPolicy,
    ) -> Result<Decision<Registration>, StoreError>;

    async fn find_registration(&self, id: RegistrationId) -> Result<Option<Registration>, StoreError>;
    async fn find_by_code(&self, code: &RegistrationCode) -> Result<Option<Registration>, StoreError>;
    async fn confirmed_count(&self, event_id: EventId) -> Result<u64, StoreError>;

    async fn store_credential(
        &self,
        id: RegistrationId,
        payload: &str,
        security_hash: &str,
    ) -> Result<(), StoreError>;

    /// Flips status to cancelled unless a check-in exists. Never deletes the row.
    async fn cancel(&self, id: RegistrationId) -> Result<Decision<Registration>, StoreError>;
}

#[async_trait]
pub trait CheckInRepository: Send + Sync {
    async fn find_check_in(&self, registration_id: RegistrationId) -> Result<Option<CheckIn>, StoreError>;

    /// Inserts the check-in unless one already exists for the registration.
    /// The uniqueness constraint on `registration_id` is the final arbiter.
    async fn record(&self, check_in: NewCheckIn) -> Result<Decision<CheckIn>, StoreError>;
}
