use tactics_core::{ErrorSeverity, GameError, RegistryError};

/// Content failures: a template or ability that does not line up with the registry.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unknown unit template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{template}' grants '{id}': {source}")]
    UnresolvedFact {
        template: String,
        id: String,
        #[source]
        source: RegistryError,
    },

    #[error("template '{template}' knows ability '{id}': {source}")]
    UnknownAbility {
        template: String,
        id: String,
        #[source]
        source: RegistryError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl GameError for LoadError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownTemplate(_) => ErrorSeverity::Validation,
            _ => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTemplate(_) => "CONTENT_UNKNOWN_TEMPLATE",
            Self::UnresolvedFact { .. } => "CONTENT_UNRESOLVED_FACT",
            Self::UnknownAbility { .. } => "CONTENT_UNKNOWN_ABILITY",
            Self::Registry(e) => e.error_code(),
        }
    }
}
