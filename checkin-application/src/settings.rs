// Engine settings resolved through the config capability

use chrono::Duration;

use checkin_domain::ports::ConfigProvider;
use checkin_domain::{
    RedemptionWindow, DEFAULT_EARLY_WINDOW_MINUTES, DEFAULT_LATE_WINDOW_HOURS,
    DEFAULT_VALIDITY_AFTER_END_HOURS,
};

use crate::AppError;

pub const SECRET_KEY: &str = "credential.secret_key";
pub const EARLY_WINDOW_MINUTES: &str = "checkin.early_window_minutes";
pub const LATE_WINDOW_HOURS: &str = "checkin.late_window_hours";
pub const VALIDITY_AFTER_END_HOURS: &str = "credential.validity_after_end_hours";
pub const CODE_ATTEMPTS: &str = "registration.code_attempts";

pub const DEFAULT_CODE_ATTEMPTS: u32 = 10;

/// Upper bound for any configured window, keeps timestamp arithmetic in range.
pub const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub secret_key: String,
    pub window: RedemptionWindow,
    pub validity_after_end: Duration,
    pub code_attempts: u32,
}

impl EngineSettings {
    pub fn load(provider: &dyn ConfigProvider) -> Result<Self, AppError> {
        let secret_key = provider
            .get_text(SECRET_KEY)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "setting '{}' must be a non-empty string",
                    SECRET_KEY
                ))
            })?;

        let before_start = span(
            provider,
            EARLY_WINDOW_MINUTES,
            DEFAULT_EARLY_WINDOW_MINUTES,
            Duration::try_minutes,
        )?;
        let after_end = span(
            provider,
            LATE_WINDOW_HOURS,
            DEFAULT_LATE_WINDOW_HOURS,
            Duration::try_hours,
        )?;
        let validity_after_end = span(
            provider,
            VALIDITY_AFTER_END_HOURS,
            DEFAULT_VALIDITY_AFTER_END_HOURS,
            Duration::try_hours,
        )?;
        let code_attempts = provider
            .get_integer(CODE_ATTEMPTS)
            .and_then(|value| u32::try_from(value).ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_CODE_ATTEMPTS);

        Ok(Self {
            secret_key,
            window: RedemptionWindow {
                before_start,
                after_end,
            },
            validity_after_end,
            code_attempts,
        })
    }
}

fn span(
    provider: &dyn ConfigProvider,
    key: &str,
    default: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, AppError> {
    let value = provider
        .get_integer(key)
        .filter(|value| *value >= 0)
        .unwrap_or(default);
    unit(value)
        .filter(|span| *span <= Duration::days(MAX_WINDOW_DAYS))
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "setting '{}' is out of range: {}",
                key,
                value
            ))
        })
}
