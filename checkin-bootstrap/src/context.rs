use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use checkin_application::{AppState, EngineSettings, Metrics, RenderCache};
use checkin_domain::ports::{CheckInRepository, EventRepository, RegistrationRepository};
use checkin_infrastructure::{
    AppConfig, DefaultHealthService, HttpCredentialRenderer, MemoryStore, PostgresStore,
    StoreBackend, TomlSettingsProvider, WebhookNotifier,
};

pub struct AppContext {
    pub state: AppState,
}

struct Stores {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    check_ins: Arc<dyn CheckInRepository>,
}

impl AppContext {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load_from(path).await?,
            None => AppConfig::load().await?,
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let runtime_config = config.to_runtime_config();
        let settings = Arc::new(TomlSettingsProvider::from_table(&config.settings));
        // Fail at startup rather than on the first request.
        EngineSettings::load(settings.as_ref())?;

        let stores = build_stores(&config).await?;
        let renderer = Arc::new(HttpCredentialRenderer::new(
            config.render_service_url.clone(),
            config.request_timeout_seconds,
        )?);
        let notifier = Arc::new(WebhookNotifier::new(
            config.notify_webhook_url.clone(),
            config.notify_webhook_token.clone(),
            config.request_timeout_seconds,
        ));
        let health = Arc::new(DefaultHealthService::new(
            stores.events.clone(),
            renderer.clone(),
        ));

        let state = AppState {
            config: runtime_config,
            settings,
            events: stores.events,
            registrations: stores.registrations,
            check_ins: stores.check_ins,
            renderer,
            notifier,
            health,
            render_cache: Arc::new(RenderCache::default()),
            metrics: Arc::new(Metrics::default()),
        };
        Ok(Self { state })
    }
}

async fn build_stores(config: &AppConfig) -> Result<Stores> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("using in-memory store");
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                events: store.clone(),
                registrations: store.clone(),
                check_ins: store,
            })
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("database_url is required for the postgres store"))?;
            let store = Arc::new(PostgresStore::connect(url, config.database_max_connections).await?);
            store.ensure_schema().await?;
            Ok(Stores {
                events: store.clone(),
                registrations: store.clone(),
                check_ins: store,
            })
        }
    }
}
