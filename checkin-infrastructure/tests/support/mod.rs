#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};

use checkin_application::{AppState, Metrics, RenderCache};
use checkin_domain::ports::{CredentialRenderer, RegistrationNotifier};
use checkin_domain::{
    Attendee, AttendeeId, ConfigValue, Event, EventId, EventStatus, Registration, RuntimeConfig,
};
use checkin_infrastructure::{
    DefaultHealthService, HttpCredentialRenderer, MemoryStore, TomlSettingsProvider,
};

pub const SECRET: &str = "integration-secret";

#[derive(Default)]
pub struct CountingRenderer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CredentialRenderer for CountingRenderer {
    async fn render(&self, payload: &str, size: u32) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}:{}", size, payload.len()).into_bytes())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: AtomicUsize,
}

impl RegistrationNotifier for RecordingNotifier {
    fn spawn_notification(&self, _attendee: Attendee, _registration: Registration) {
        self.sent.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub renderer: Arc<CountingRenderer>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Whole seconds keep timestamp comparisons exact.
pub fn base_time() -> DateTime<Utc> {
    Utc::now()
        .duration_trunc(Duration::seconds(1))
        .unwrap_or_else(|_| Utc::now())
}

pub fn event(id: i64, capacity: Option<u32>, now: DateTime<Utc>) -> Event {
    let start = now + Duration::days(2);
    Event {
        id: EventId(id),
        title: format!("Event {}", id),
        venue: "Conference Center".to_string(),
        start_date: start,
        end_date: start + Duration::hours(6),
        max_capacity: capacity,
        registration_deadline: Some(start - Duration::hours(1)),
        status: EventStatus::Published,
    }
}

pub fn attendee(id: i64) -> Attendee {
    Attendee {
        id: AttendeeId(id),
        name: format!("Attendee {}", id),
        email: Some(format!("attendee{}@example.org", id)),
    }
}

pub async fn harness() -> Harness {
    harness_with(TomlSettingsProvider::default()).await
}

pub async fn harness_with(settings: TomlSettingsProvider) -> Harness {
    let store = Arc::new(MemoryStore::new());
    for id in 1..=20 {
        store.upsert_attendee(attendee(id)).await;
    }
    let renderer = Arc::new(CountingRenderer::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let settings = settings.with_value("credential.secret_key", ConfigValue::Text(SECRET.to_string()));
    let health_client = Arc::new(HttpCredentialRenderer::new(None, 5).expect("client"));

    let state = AppState {
        config: RuntimeConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            api_token: None,
            public_base_url: "https://checkin.example.org".to_string(),
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 5,
        },
        settings: Arc::new(settings),
        events: store.clone(),
        registrations: store.clone(),
        check_ins: store.clone(),
        renderer: renderer.clone(),
        notifier: notifier.clone(),
        health: Arc::new(DefaultHealthService::new(store.clone(), health_client)),
        render_cache: Arc::new(RenderCache::default()),
        metrics: Arc::new(Metrics::default()),
    };
    Harness {
        state,
        store,
        renderer,
        notifier,
    }
}
