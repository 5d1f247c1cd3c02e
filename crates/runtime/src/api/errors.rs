//! Unified error types surfaced by the runtime API.
//!
//! Gameplay failures never show up here: the session folds them into
//! `ok: false` responses. These are plumbing and startup failures.
use tactics_content::LoadError;
use tactics_core::{ErrorSeverity, GameError};
use thiserror::Error;
use tokio::sync::oneshot;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session worker command channel closed")]
    CommandChannelClosed,

    #[error("session worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("session worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("failed to load content")]
    Content(#[from] LoadError),

    #[error(transparent)]
    ContentFiles(#[from] anyhow::Error),

    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: &'static str, value: String },
}

impl GameError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Repository(e) => e.severity(),
            Self::Content(_) | Self::ContentFiles(_) | Self::InvalidEnv { .. } => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            Self::Repository(e) => e.error_code(),
            Self::Content(e) => e.error_code(),
            Self::ContentFiles(_) => "RUNTIME_CONTENT_FILES",
            Self::InvalidEnv { .. } => "RUNTIME_INVALID_ENV",
        }
    }
}
