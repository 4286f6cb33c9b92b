use std::time::Duration;

use anyhow::Result;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use checkin_domain::ports::RegistrationNotifier;
use checkin_domain::{Attendee, Registration};

/// Posts a confirmation to an HTTP webhook after a successful registration.
/// Delivery runs on a detached task; failures are logged and never surface.
pub struct WebhookNotifier {
    url: Option<String>,
    token: Option<String>,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>, token: Option<String>, timeout_seconds: u64) -> Self {
        Self {
            url,
            token,
            timeout: Duration::from_secs(timeout_seconds.max(3)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

impl RegistrationNotifier for WebhookNotifier {
    fn spawn_notification(&self, attendee: Attendee, registration: Registration) {
        let Some(url) = self.url.clone() else {
            debug!(
                "no notification webhook configured, skipping registration {}",
                registration.id
            );
            return;
        };
        let token = self.token.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            if let Err(err) = send_notification(&url, token.as_deref(), timeout, &attendee, &registration).await {
                warn!(
                    "registration notification failed for {}: {}",
                    registration.id, err
                );
            }
        });
    }
}

async fn send_notification(
    url: &str,
    token: Option<&str>,
    timeout: Duration,
    attendee: &Attendee,
    registration: &Registration,
) -> Result<()> {
    let payload = build_payload(attendee, registration);
    let client = Client::builder().timeout(timeout).build()?;
    let mut request = client.post(url).json(&payload);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    request.send().await?.error_for_status()?;
    Ok(())
}

fn build_payload(attendee: &Attendee, registration: &Registration) -> serde_json::Value {
    json!({
        "type": "registration_confirmed",
        "registration_id": registration.id,
        "event_id": registration.event_id,
        "registration_code": registration.registration_code,
        "attendee": {
            "id": attendee.id,
            "name": attendee.name,
            "email": attendee.email,
        },
        "credential": registration.credential_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_domain::{AttendeeId, EventId, RegistrationCode, RegistrationId, RegistrationStatus};
    use chrono::Utc;

    #[test]
    fn payload_carries_code_and_attendee() {
        let attendee = Attendee {
            id: AttendeeId(4),
            name: "Ada".to_string(),
            email: Some("ada@example.org".to_string()),
        };
        let registration = Registration {
            id: RegistrationId(11),
            event_id: EventId(2),
            attendee_id: AttendeeId(4),
            registration_code: RegistrationCode::parse("ZXCV0987").expect("code"),
            credential_payload: Some("{}".to_string()),
            security_hash: None,
            status: RegistrationStatus::Confirmed,
            registration_date: Utc::now(),
        };

        let payload = build_payload(&attendee, &registration);
        assert_eq!(payload["registration_code"], "ZXCV0987");
        assert_eq!(payload["attendee"]["email"], "ada@example.org");
        assert_eq!(payload["registration_id"], 11);
    }

    #[test]
    fn unconfigured_notifier_is_a_no_op() {
        let notifier = WebhookNotifier::new(None, None, 5);
        assert!(!notifier.is_configured());
    }
}
