//! Unified error type for Moo.

use moo_room::{ErrorKind, GameError};
use moo_store::StoreError;

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held something unparsable.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MooError {
    /// The caller presented no token, or one the authenticator rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A room or game operation failed.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The store failed outside a game operation (opening it, sweeping).
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MooError {
    /// How a client should treat this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Game(e) => e.kind(),
            Self::Store(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moo_core::RoomCode;

    #[test]
    fn test_from_game_error_keeps_kind() {
        let err: MooError = GameError::RoomNotFound(RoomCode::new("ABCD")).into();
        assert!(matches!(err, MooError::Game(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "room ABCD not found");
    }

    #[test]
    fn test_from_store_error_is_internal() {
        let err: MooError = StoreError::Backend("disk full".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_unauthorized_kind() {
        let err = MooError::Unauthorized("missing token".into());
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_config_error_message() {
        let err: MooError = ConfigError::Invalid {
            var: "MOO_CODE_ATTEMPTS",
            value: "lots".into(),
            reason: "invalid digit found in string".into(),
        }
        .into();
        assert!(err.to_string().contains("MOO_CODE_ATTEMPTS"));
    }
}
