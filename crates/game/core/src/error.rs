//! Shared error classification.
//!
//! Each subsystem owns its error enum next to the code that raises it
//! ([`RegistryError`](crate::registry::RegistryError),
//! [`SaveError`](crate::save::SaveError),
//! [`SchedulerError`](crate::scheduler::SchedulerError)). They all implement
//! [`GameError`] so drivers can log a stable code and decide whether to keep
//! going.
//!
//! Only [`ErrorSeverity::Fatal`] may halt the process. Anything raised while a
//! game is running leaves the simulation continuable.

/// How a caller should treat an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Nothing changed; the driver may try something else.
    Recoverable,
    /// Malformed input, such as a bad dice formula or an unknown command.
    Validation,
    /// Inconsistent state, such as a fact whose owner is gone.
    Internal,
    /// Broken content or configuration: a duplicate brick id, or a save that
    /// names an unknown brick.
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// True if startup, or the load in progress, must stop.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Implemented by every error enum in the workspace.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Stable identifier for logs and wire replies; defaults to the type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("unnamed")]
    struct Unnamed;

    impl GameError for Unnamed {
        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Internal
        }
    }

    #[test]
    fn only_fatal_is_fatal() {
        assert!(ErrorSeverity::Fatal.is_fatal());
        assert!(!ErrorSeverity::Internal.is_fatal());
        assert!(ErrorSeverity::Recoverable.is_recoverable());
        assert_eq!(ErrorSeverity::Validation.as_str(), "validation");
    }

    #[test]
    fn error_code_defaults_to_the_type_name() {
        assert!(Unnamed.error_code().ends_with("Unnamed"));
        assert!(!Unnamed.severity().is_recoverable());
    }
}
