use same_core::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("no such note or chunk: {0}")]
    NotFound(String),
    #[error("embedding provider mismatch: stored {stored} != active {active}")]
    ProviderMismatch { stored: String, active: String },
    #[error("vector has wrong dimensionality: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vector is empty or all-zero")]
    InvalidVector,
    #[error("failed to serialize graph node properties: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::ProviderMismatch { .. } | StoreError::InvalidVector => {
                ErrorKind::InputValidation
            }
            _ => ErrorKind::Store,
        }
    }
}
