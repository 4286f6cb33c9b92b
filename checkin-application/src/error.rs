use thiserror::Error;

use checkin_domain::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(msg) => AppError::StorageUnavailable(msg),
            StoreError::Conflict(msg) => AppError::StorageUnavailable(format!("conflict: {}", msg)),
        }
    }
}
