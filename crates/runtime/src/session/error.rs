use tactics_content::LoadError;
use tactics_core::{
    EntityId, ErrorSeverity, GameError, RegistryError, SaveError, SchedulerError,
};

use crate::repository::RepositoryError;

/// Why a request was answered with `ok: false`.
///
/// None of these leave the session in a broken state; the game continues
/// from where it was before the request.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("bad '{cmd}' request: {reason}")]
    BadRequest { cmd: String, reason: String },

    #[error("no unit {0}")]
    UnknownUnit(EntityId),

    #[error("no unit called '{0}'")]
    NoSuchName(String),

    #[error("unknown query key '{0}'")]
    UnknownQueryKey(String),

    #[error("unknown damage type '{0}'")]
    UnknownDamageType(String),

    #[error("'{id}': {source}")]
    Brick {
        id: String,
        #[source]
        source: RegistryError,
    },

    #[error("{unit} has no fact '{brick_id}'")]
    NoSuchFact { unit: EntityId, brick_id: String },

    #[error("grant needs either 'fact' or 'action'")]
    NothingToGrant,

    #[error("no room to spawn '{0}'")]
    NoRoom(String),

    #[error("no save repository is attached")]
    NoRepository,

    #[error("save slot '{0}' is empty")]
    EmptySlot(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Content(#[from] LoadError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SessionError {
    pub fn brick(id: impl Into<String>, source: RegistryError) -> Self {
        Self::Brick {
            id: id.into(),
            source,
        }
    }
}

impl GameError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Scheduler(e) => e.severity(),
            Self::Content(e) => e.severity(),
            Self::Repository(e) => e.severity(),
            // a save that fails to rebuild is rejected; the live game is kept
            Self::Save(_) => ErrorSeverity::Recoverable,
            Self::NoRepository => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "SESSION_BAD_REQUEST",
            Self::UnknownUnit(_) => "SESSION_UNKNOWN_UNIT",
            Self::NoSuchName(_) => "SESSION_NO_SUCH_NAME",
            Self::UnknownQueryKey(_) => "SESSION_UNKNOWN_QUERY_KEY",
            Self::UnknownDamageType(_) => "SESSION_UNKNOWN_DAMAGE_TYPE",
            Self::Brick { .. } => "SESSION_BRICK",
            Self::NoSuchFact { .. } => "SESSION_NO_SUCH_FACT",
            Self::NothingToGrant => "SESSION_NOTHING_TO_GRANT",
            Self::NoRoom(_) => "SESSION_NO_ROOM",
            Self::NoRepository => "SESSION_NO_REPOSITORY",
            Self::EmptySlot(_) => "SESSION_EMPTY_SLOT",
            Self::Scheduler(e) => e.error_code(),
            Self::Content(e) => e.error_code(),
            Self::Save(e) => e.error_code(),
            Self::Repository(e) => e.error_code(),
        }
    }
}
