// Error types for guild configuration

use thiserror::Error;

use crate::store::StoreError;

/// Input rejected by a field-level rule. Raised before any write is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid name")]
    InvalidName,

    #[error("invalid prefix")]
    InvalidPrefix,

    #[error("action must be join or leave")]
    InvalidAction,

    #[error("levelling must be boolean")]
    LevellingNotBoolean,

    /// A reserved message list was written with something other than a list of strings
    #[error("{0} must be a list of strings")]
    InvalidMessages(&'static str),
}

/// Anything a guild operation can fail with
#[derive(Debug, Error)]
pub enum GuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl GuildError {
    pub fn is_validation(&self) -> bool {
        matches!(self, GuildError::Validation(_))
    }

    /// The validation failure, if that is what this is
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            GuildError::Validation(e) => Some(e),
            GuildError::Persistence(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(ValidationError::InvalidName.to_string(), "invalid name");
        assert_eq!(ValidationError::InvalidAction.to_string(), "action must be join or leave");
        assert_eq!(
            ValidationError::InvalidMessages("join_messages").to_string(),
            "join_messages must be a list of strings"
        );
    }

    #[test]
    fn test_from_conversions() {
        let err: GuildError = ValidationError::InvalidPrefix.into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "invalid prefix");

        let err: GuildError = StoreError::Storage("disk full".into()).into();
        assert!(!err.is_validation());
        assert!(err.as_validation().is_none());
    }
}
