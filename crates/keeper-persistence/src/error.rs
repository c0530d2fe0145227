//! Persistence error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt state for bot '{bot}': {reason}")]
    Corrupt { bot: String, reason: String },

    #[error("Invalid bot name for storage: {0:?}")]
    InvalidName(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
