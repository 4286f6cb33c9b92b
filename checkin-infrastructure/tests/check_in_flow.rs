mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use checkin_application::commands::{
    cancel_registration, check_in_at, manual_check_in_at, reissue_credential,
    register_attendee_at,
};
use checkin_application::credentials::PresentedCredential;
use checkin_application::dtos::RegistrationReceipt;
use checkin_application::queries::{get_check_in, render_credential, verify_credential_at};
use checkin_domain::{
    AttendeeId, CheckInMethod, ConfigValue, EligibilityIssue, EventId, EventStatus, OperatorId,
    RegistrationStatus, Rejection,
};

use checkin_infrastructure::TomlSettingsProvider;

use support::{base_time, event, harness, harness_with, Harness};

async fn registered(h: &Harness, capacity: Option<u32>) -> (RegistrationReceipt, DateTime<Utc>) {
    let now = base_time();
    h.store.upsert_event(event(1, capacity, now)).await;
    let receipt = register_attendee_at(&h.state, EventId(1), AttendeeId(3), now)
        .await
        .expect("engine")
        .expect("admitted");
    // Half an hour before doors open.
    let door_time = now + Duration::days(2) - Duration::minutes(30);
    (receipt, door_time)
}

fn scanned(receipt: &RegistrationReceipt) -> PresentedCredential {
    PresentedCredential::Payload(serde_json::to_string(&receipt.credential).expect("serialize"))
}

fn edited(receipt: &RegistrationReceipt, edit: impl FnOnce(&mut Value)) -> PresentedCredential {
    let mut value = serde_json::to_value(&receipt.credential).expect("to value");
    edit(&mut value);
    PresentedCredential::Payload(value.to_string())
}

#[tokio::test]
async fn scan_then_rescan_reports_original_check_in() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, Some(50)).await;

    let first = check_in_at(&h.state, &scanned(&receipt), Some(OperatorId(7)), None, door_time)
        .await
        .expect("engine")
        .expect("checked in");
    assert_eq!(first.check_in.method, CheckInMethod::ScannedCode);
    assert_eq!(first.check_in.operator_id, Some(OperatorId(7)));
    assert_eq!(first.registration.credential_version.as_deref(), Some("2.0"));

    let later = door_time + Duration::minutes(10);
    let second = check_in_at(&h.state, &scanned(&receipt), Some(OperatorId(8)), None, later)
        .await
        .expect("engine");
    assert_eq!(
        second.unwrap_err(),
        Rejection::AlreadyCheckedIn {
            checked_in_at: first.check_in.checked_in_at,
            operator_id: Some(OperatorId(7)),
        }
    );

    let stored = get_check_in(&h.state, receipt.registration.id)
        .await
        .expect("check-in");
    assert_eq!(stored.checked_in_at, door_time);
    assert_eq!(h.store.check_in_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_record_once() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, None).await;
    let presented = scanned(&receipt);

    let state = Arc::new(h.state.clone());
    let mut tasks = Vec::new();
    for operator in 1..=6 {
        let state = state.clone();
        let presented = presented.clone();
        tasks.push(tokio::spawn(async move {
            check_in_at(&state, &presented, Some(OperatorId(operator)), None, door_time).await
        }));
    }

    let mut recorded = 0;
    for task in tasks {
        match task.await.expect("join").expect("engine") {
            Ok(_) => recorded += 1,
            Err(Rejection::AlreadyCheckedIn { .. }) => {}
            Err(other) => panic!("unexpected rejection {:?}", other),
        }
    }
    assert_eq!(recorded, 1);
    assert_eq!(h.store.check_in_count().await, 1);
}

#[tokio::test]
async fn edited_claims_are_tampered() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, None).await;

    let other_attendee = edited(&receipt, |value| value["attendee_id"] = json!(4));
    let outcome = verify_credential_at(&h.state, &other_attendee, door_time)
        .await
        .expect("engine");
    assert_eq!(outcome.unwrap_err(), Rejection::TamperedPayload);

    let forged_hash = edited(&receipt, |value| value["security_hash"] = json!("00".repeat(32)));
    let outcome = verify_credential_at(&h.state, &forged_hash, door_time)
        .await
        .expect("engine");
    let rejection = outcome.unwrap_err();
    assert_eq!(rejection, Rejection::TamperedPayload);
    assert_eq!(rejection.public_message(), "invalid credential");

    let metrics = h.state.metrics.render_prometheus();
    assert!(metrics.contains("checkin_tampered_credentials_total 2"));
    assert_eq!(h.store.check_in_count().await, 0);
}

#[tokio::test]
async fn structural_rejections() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, None).await;

    let garbage = PresentedCredential::Payload("{not json".to_string());
    let outcome = verify_credential_at(&h.state, &garbage, door_time).await.expect("engine");
    assert!(matches!(outcome, Err(Rejection::MalformedPayload(_))));

    let missing = edited(&receipt, |value| {
        value.as_object_mut().expect("object").remove("expires_at");
    });
    let outcome = verify_credential_at(&h.state, &missing, door_time).await.expect("engine");
    assert!(matches!(outcome, Err(Rejection::MalformedPayload(_))));

    let future = edited(&receipt, |value| value["version"] = json!("3.0"));
    let outcome = verify_credential_at(&h.state, &future, door_time).await.expect("engine");
    assert_eq!(outcome.unwrap_err(), Rejection::UnsupportedVersion("3.0".to_string()));

    let unknown = edited(&receipt, |value| value["registration_id"] = json!(9_999));
    let outcome = verify_credential_at(&h.state, &unknown, door_time).await.expect("engine");
    assert_eq!(outcome.unwrap_err(), Rejection::UnknownRegistration);
}

#[tokio::test]
async fn expiry_boundary_is_inclusive() {
    let h = harness().await;
    let (receipt, _) = registered(&h, None).await;
    let expires_at = receipt.credential.expires_at;

    let at_expiry = verify_credential_at(&h.state, &scanned(&receipt), expires_at)
        .await
        .expect("engine");
    assert!(at_expiry.is_ok());

    let just_before = verify_credential_at(&h.state, &scanned(&receipt), expires_at - Duration::seconds(1))
        .await
        .expect("engine");
    assert!(just_before.is_ok());

    let just_after = verify_credential_at(&h.state, &scanned(&receipt), expires_at + Duration::seconds(1))
        .await
        .expect("engine");
    assert_eq!(just_after.unwrap_err(), Rejection::Expired { expires_at });
}

#[tokio::test]
async fn legacy_payload_without_expiry_is_accepted() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, None).await;
    let credential = &receipt.credential;
    let legacy = json!({
        "registration_id": credential.registration_id,
        "registration_code": credential.registration_code,
        "event_id": credential.event_id,
        "attendee_id": credential.attendee_id,
        "security_hash": credential.security_hash,
    });

    let summary = verify_credential_at(
        &h.state,
        &PresentedCredential::Payload(legacy.to_string()),
        door_time,
    )
    .await
    .expect("engine")
    .expect("legacy accepted");
    assert_eq!(summary.credential_version.as_deref(), Some("1.0"));
    assert_eq!(h.store.check_in_count().await, 0);
}

#[tokio::test]
async fn presented_expiry_cannot_outlive_the_event() {
    let settings = TomlSettingsProvider::default()
        .with_value("credential.validity_after_end_hours", ConfigValue::Integer(1))
        .with_value("checkin.late_window_hours", ConfigValue::Integer(48));
    let h = harness_with(settings).await;
    let (receipt, door_time) = registered(&h, None).await;
    let end = door_time + Duration::minutes(30) + Duration::hours(6);
    let expires_at = end + Duration::hours(1);
    let late = expires_at + Duration::hours(5);

    let honest = verify_credential_at(&h.state, &scanned(&receipt), late)
        .await
        .expect("engine");
    assert_eq!(honest.unwrap_err(), Rejection::Expired { expires_at });

    let bumped = edited(&receipt, |value| {
        value["expires_at"] = json!((end + Duration::days(30)).to_rfc3339());
    });
    let outcome = verify_credential_at(&h.state, &bumped, late)
        .await
        .expect("engine");
    assert_eq!(outcome.unwrap_err(), Rejection::Expired { expires_at });

    let shortened = edited(&receipt, |value| {
        value["expires_at"] = json!((door_time - Duration::hours(1)).to_rfc3339());
    });
    let outcome = verify_credential_at(&h.state, &shortened, door_time)
        .await
        .expect("engine");
    assert_eq!(
        outcome.unwrap_err(),
        Rejection::Expired {
            expires_at: door_time - Duration::hours(1)
        }
    );
}

#[tokio::test]
async fn redemption_window_is_enforced() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, None).await;
    let start = door_time + Duration::minutes(30);

    let too_early = start - Duration::minutes(121);
    let outcome = verify_credential_at(&h.state, &scanned(&receipt), too_early)
        .await
        .expect("engine");
    assert_eq!(
        outcome.unwrap_err(),
        Rejection::EventNotEligible(EligibilityIssue::TooEarly {
            opens_at: start - Duration::minutes(120)
        })
    );

    let mut cancelled = event(1, None, start - Duration::days(2));
    cancelled.status = EventStatus::Cancelled;
    h.store.upsert_event(cancelled).await;
    let outcome = verify_credential_at(&h.state, &scanned(&receipt), door_time)
        .await
        .expect("engine");
    assert_eq!(
        outcome.unwrap_err(),
        Rejection::EventNotEligible(EligibilityIssue::EventCancelled)
    );
}

#[tokio::test]
async fn typed_code_and_manual_lookup() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, None).await;

    let typed = PresentedCredential::Code(receipt.credential.registration_code.to_lowercase());
    let summary = verify_credential_at(&h.state, &typed, door_time)
        .await
        .expect("engine")
        .expect("code accepted");
    assert_eq!(summary.method, CheckInMethod::ManualCode);

    let bad = PresentedCredential::Code("SHORT".to_string());
    let outcome = verify_credential_at(&h.state, &bad, door_time).await.expect("engine");
    assert!(matches!(outcome, Err(Rejection::MalformedPayload(_))));

    let receipt = manual_check_in_at(
        &h.state,
        receipt.registration.id,
        OperatorId(2),
        Some("  lost phone ".to_string()),
        door_time,
    )
    .await
    .expect("engine")
    .expect("checked in");
    assert_eq!(receipt.check_in.method, CheckInMethod::ManualId);
    assert_eq!(receipt.check_in.note.as_deref(), Some("lost phone"));
}

#[tokio::test]
async fn cancelled_and_checked_in_registrations() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, None).await;
    check_in_at(&h.state, &scanned(&receipt), None, None, door_time)
        .await
        .expect("engine")
        .expect("checked in");

    let cancel = cancel_registration(&h.state, receipt.registration.id)
        .await
        .expect("engine");
    assert!(matches!(cancel, Err(Rejection::AlreadyCheckedIn { .. })));

    let reissue = reissue_credential(&h.state, receipt.registration.id)
        .await
        .expect("engine");
    assert!(matches!(reissue, Err(Rejection::AlreadyCheckedIn { .. })));

    let now = base_time();
    let second = register_attendee_at(&h.state, EventId(1), AttendeeId(5), now)
        .await
        .expect("engine")
        .expect("admitted");
    cancel_registration(&h.state, second.registration.id)
        .await
        .expect("engine")
        .expect("cancelled");
    let outcome = check_in_at(&h.state, &scanned(&second), None, None, door_time)
        .await
        .expect("engine");
    assert_eq!(
        outcome.unwrap_err(),
        Rejection::NotConfirmed {
            status: RegistrationStatus::Cancelled
        }
    );
}

#[tokio::test]
async fn reissued_credential_keeps_hash() {
    let h = harness().await;
    let (receipt, door_time) = registered(&h, None).await;

    let reissued = reissue_credential(&h.state, receipt.registration.id)
        .await
        .expect("engine")
        .expect("reissued");
    assert_eq!(reissued.security_hash, receipt.credential.security_hash);
    assert!(reissued.issued_at >= receipt.credential.issued_at);

    let presented = PresentedCredential::Payload(serde_json::to_string(&reissued).expect("serialize"));
    verify_credential_at(&h.state, &presented, door_time)
        .await
        .expect("engine")
        .expect("reissued credential verifies");
}

#[tokio::test]
async fn rendered_images_are_cached() {
    let h = harness().await;
    let (receipt, _) = registered(&h, None).await;
    let id = receipt.registration.id;

    let first = render_credential(&h.state, id, Some(256)).await.expect("render");
    let second = render_credential(&h.state, id, Some(256)).await.expect("render");
    assert_eq!(first, second);
    assert!(first.starts_with(b"300:"));
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 1);

    // Nearby sizes share the same cached image.
    for size in [None, Some(200), Some(299), Some(300)] {
        let image = render_credential(&h.state, id, size).await.expect("render");
        assert_eq!(image, first);
    }
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 1);

    let largest = render_credential(&h.state, id, Some(10_000)).await.expect("render");
    assert!(largest.starts_with(b"1024:"));
    render_credential(&h.state, id, Some(1000)).await.expect("render");
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 2);

    reissue_credential(&h.state, id).await.expect("engine").expect("reissued");
    render_credential(&h.state, id, Some(256)).await.expect("render");
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 3);
}
