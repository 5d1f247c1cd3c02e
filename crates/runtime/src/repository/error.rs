//! Error types raised by save repositories.
use tactics_core::{ErrorSeverity, GameError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("save repository lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("corrupted save '{slot}': {reason}")]
    CorruptedData { slot: String, reason: String },

    #[error("invalid save slot name '{0}'")]
    InvalidSlot(String),
}

impl GameError for RepositoryError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidSlot(_) => ErrorSeverity::Validation,
            Self::CorruptedData { .. } => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::LockPoisoned => "REPOSITORY_LOCK_POISONED",
            Self::Io(_) => "REPOSITORY_IO",
            Self::Serialization(_) => "REPOSITORY_SERIALIZATION",
            Self::Json(_) => "REPOSITORY_JSON",
            Self::CorruptedData { .. } => "REPOSITORY_CORRUPTED",
            Self::InvalidSlot(_) => "REPOSITORY_INVALID_SLOT",
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
