use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use checkin_domain::RuntimeConfig;

pub const SECRET_KEY_ENV: &str = "CHECKIN_CREDENTIAL_SECRET_KEY";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Some(StoreBackend::Memory),
            "postgres" | "postgresql" => Some(StoreBackend::Postgres),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub public_base_url: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub notify_webhook_url: Option<String>,
    pub notify_webhook_token: Option<String>,
    pub render_service_url: Option<String>,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    /// Engine settings, flattened to dotted keys (`credential.secret_key`).
    pub settings: BTreeMap<String, toml::Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            public_base_url: "http://127.0.0.1:3240".to_string(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 10,
            notify_webhook_url: None,
            notify_webhook_token: None,
            render_service_url: None,
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 15,
            settings: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("CHECKIN_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        Self::load_from(Path::new(&path)).await
    }

    pub async fn load_from(file_path: &Path) -> Result<Self> {
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            toml::from_str::<AppConfig>(&content)?
        } else {
            warn!("{} not found, using defaults", file_path.display());
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.api_token = normalize_optional(self.api_token.take());
        self.database_url = normalize_optional(self.database_url.take());
        self.notify_webhook_url = normalize_optional(self.notify_webhook_url.take());
        self.notify_webhook_token = normalize_optional(self.notify_webhook_token.take());
        self.render_service_url = normalize_optional(self.render_service_url.take());
        self.public_base_url = self.public_base_url.trim().trim_end_matches('/').to_string();
        if self.database_max_connections == 0 {
            self.database_max_connections = 1;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.public_base_url.is_empty() {
            return Err(anyhow!("public_base_url must not be empty"));
        }
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.store_backend == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(anyhow!("database_url is required for the postgres store"));
        }
        let secret = self
            .settings
            .get("credential.secret_key")
            .or_else(|| {
                self.settings
                    .get("credential")
                    .and_then(|table| table.get("secret_key"))
            })
            .and_then(toml::Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if secret.is_empty() {
            return Err(anyhow!(
                "settings.credential.secret_key must be set (or {})",
                SECRET_KEY_ENV
            ));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            public_base_url: self.public_base_url.clone(),
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("CHECKIN_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("CHECKIN_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("CHECKIN_PUBLIC_BASE_URL") {
            self.public_base_url = value;
        }
        if let Ok(value) = env::var("CHECKIN_STORE_BACKEND") {
            match StoreBackend::parse(&value) {
                Some(backend) => self.store_backend = backend,
                None => warn!("ignoring unknown CHECKIN_STORE_BACKEND '{}'", value),
            }
        }
        if let Ok(value) = env::var("CHECKIN_DATABASE_URL") {
            self.database_url = Some(value);
        }
        if let Ok(value) = env::var("CHECKIN_DATABASE_MAX_CONNECTIONS") {
            self.database_max_connections = value.parse().unwrap_or(self.database_max_connections);
        }
        if let Ok(value) = env::var("CHECKIN_NOTIFY_WEBHOOK_URL") {
            self.notify_webhook_url = Some(value);
        }
        if let Ok(value) = env::var("CHECKIN_NOTIFY_WEBHOOK_TOKEN") {
            self.notify_webhook_token = Some(value);
        }
        if let Ok(value) = env::var("CHECKIN_RENDER_SERVICE_URL") {
            self.render_service_url = Some(value);
        }
        if let Ok(value) = env::var("CHECKIN_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("CHECKIN_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
        // The dotted key sorts after a `[settings.credential]` table and wins when flattened.
        if let Ok(value) = env::var(SECRET_KEY_ENV) {
            self.settings
                .insert("credential.secret_key".to_string(), toml::Value::String(value));
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
