use async_trait::async_trait;

use crate::entities::{Attendee, Registration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Text(String),
    Integer(i64),
    Flag(bool),
}

/// Narrow view of the settings subsystem.
pub trait ConfigProvider: Send + Sync {
    fn get_config(&self, key: &str) -> Option<ConfigValue>;

    fn get_text(&self, key: &str) -> Option<String> {
        match self.get_config(key)? {
            ConfigValue::Text(value) => Some(value),
            ConfigValue::Integer(value) => Some(value.to_string()),
            ConfigValue::Flag(value) => Some(value.to_string()),
        }
    }

    fn get_integer(&self, key: &str) -> Option<i64> {
        match self.get_config(key)? {
            ConfigValue::Integer(value) => Some(value),
            ConfigValue::Text(value) => value.trim().parse().ok(),
            ConfigValue::Flag(_) => None,
        }
    }
}

/// Turns a serialized credential into image bytes. Stateless and retryable.
#[async_trait]
pub trait CredentialRenderer: Send + Sync {
    async fn render(&self, payload: &str, size: u32) -> anyhow::Result<Vec<u8>>;
}

/// Best-effort delivery; implementations log failures and never report them back.
pub trait RegistrationNotifier: Send + Sync {
    fn spawn_notification(&self, attendee: Attendee, registration: Registration);
}

#[async_trait]
pub trait HealthCheckService: Send + Sync {
    async fn check_store(&self) -> anyhow::Result<bool>;
    async fn check_renderer(&self) -> anyhow::Result<bool>;
}
