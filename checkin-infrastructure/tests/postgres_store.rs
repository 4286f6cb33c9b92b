// Runs against a live PostgreSQL:
// DATABASE_URL=postgres://... cargo test -p checkin-infrastructure --test postgres_store -- --ignored

mod support;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use checkin_application::credentials::CodeGenerator;
use checkin_application::utils::storage_precision;
use checkin_domain::{
    AttendeeId, CapacityGuard, CheckInMethod, CheckInRepository, EventId, NewCheckIn,
    NewRegistration, OperatorId, Registration, RegistrationCode, RegistrationRepository,
    RegistrationStatus, Rejection, StoreError,
};
use checkin_infrastructure::PostgresStore;

use support::{attendee, base_time, event};

async fn store() -> Option<Arc<PostgresStore>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let store = PostgresStore::connect(&url, 16).await.expect("connect");
    store.ensure_schema().await.expect("schema");
    Some(Arc::new(store))
}

/// Ids derived from the clock so repeated runs do not collide.
fn run_id() -> i64 {
    Utc::now().timestamp_micros()
}

async fn seed(store: &PostgresStore, event_id: i64, capacity: Option<u32>, attendees: i64) {
    let now = base_time();
    store
        .upsert_event(&event(event_id, capacity, now))
        .await
        .expect("event");
    for n in 1..=attendees {
        store
            .upsert_attendee(&attendee(event_id * 100 + n))
            .await
            .expect("attendee");
    }
}

fn draft(event_id: i64, attendee_id: i64, code: RegistrationCode, now: DateTime<Utc>) -> NewRegistration {
    NewRegistration {
        event_id: EventId(event_id),
        attendee_id: AttendeeId(attendee_id),
        registration_code: code,
        status: RegistrationStatus::Confirmed,
        registration_date: storage_precision(now),
    }
}

async fn admit_one(store: &PostgresStore, event_id: i64, attendee_id: i64) -> Registration {
    let now = base_time();
    store
        .admit(
            draft(event_id, attendee_id, CodeGenerator::random_code(), now),
            &CapacityGuard::at(now),
        )
        .await
        .expect("store")
        .expect("admitted")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_admissions_respect_capacity() {
    let Some(store) = store().await else {
        return;
    };
    let event_id = run_id();
    seed(&store, event_id, Some(1), 8).await;

    let now = base_time();
    let mut tasks = Vec::new();
    for n in 1..=8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let registration = draft(event_id, event_id * 100 + n, CodeGenerator::random_code(), now);
            store.admit(registration, &CapacityGuard::at(now)).await
        }));
    }

    let mut admitted = 0;
    let mut full = 0;
    for task in tasks {
        match task.await.expect("join").expect("store") {
            Ok(_) => admitted += 1,
            Err(Rejection::EventFull) => full += 1,
            Err(other) => panic!("unexpected rejection {:?}", other),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(full, 7);
    assert_eq!(
        store.confirmed_count(EventId(event_id)).await.expect("count"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_check_ins_record_once() {
    let Some(store) = store().await else {
        return;
    };
    let event_id = run_id();
    seed(&store, event_id, None, 1).await;
    let registration = admit_one(&store, event_id, event_id * 100 + 1).await;

    let registration_id = registration.id;
    let at = storage_precision(Utc::now());
    let mut tasks = Vec::new();
    for operator in 1..=8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .record(NewCheckIn {
                    registration_id,
                    checked_in_at: at + Duration::milliseconds(operator),
                    method: CheckInMethod::ScannedCode,
                    operator_id: Some(OperatorId(operator)),
                    note: None,
                })
                .await
        }));
    }

    let mut recorded = Vec::new();
    let mut repeats = 0;
    for task in tasks {
        match task.await.expect("join").expect("store") {
            Ok(check_in) => recorded.push(check_in),
            Err(Rejection::AlreadyCheckedIn { .. }) => repeats += 1,
            Err(other) => panic!("unexpected rejection {:?}", other),
        }
    }
    assert_eq!(recorded.len(), 1);
    assert_eq!(repeats, 7);

    let stored = store
        .find_check_in(registration.id)
        .await
        .expect("store")
        .expect("check-in");
    assert_eq!(stored.id, recorded[0].id);

    let cancel = store.cancel(registration.id).await.expect("store");
    assert!(matches!(cancel, Err(Rejection::AlreadyCheckedIn { .. })));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_codes_and_attendees_are_constrained() {
    let Some(store) = store().await else {
        return;
    };
    let event_id = run_id();
    seed(&store, event_id, None, 2).await;
    let first = admit_one(&store, event_id, event_id * 100 + 1).await;

    let now = base_time();
    let clash = store
        .admit(
            draft(event_id, event_id * 100 + 2, first.registration_code.clone(), now),
            &CapacityGuard::at(now),
        )
        .await;
    assert!(matches!(clash, Err(StoreError::Conflict(_))));

    let again = store
        .admit(
            draft(event_id, event_id * 100 + 1, CodeGenerator::random_code(), now),
            &CapacityGuard::at(now),
        )
        .await
        .expect("store");
    assert_eq!(again.unwrap_err(), Rejection::AlreadyRegistered);
}
