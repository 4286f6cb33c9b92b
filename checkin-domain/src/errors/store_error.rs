use thiserror::Error;

/// Infrastructure failures surfaced by repository ports.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A uniqueness constraint rejected a concurrent write.
    #[error("storage conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}
