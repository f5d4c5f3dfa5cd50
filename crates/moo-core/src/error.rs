//! Error types for the core layer.
//!
//! Each crate in Moo defines its own error enum. A `CoreError` always
//! means a value failed to parse: a symbol outside the alphabet, a code
//! of the wrong width, or a status string the store does not recognise.

/// Errors produced while parsing core values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A symbol that is not part of the game alphabet.
    #[error("unknown symbol {0:?}")]
    UnknownSymbol(String),

    /// A code or symbol row with the wrong number of positions.
    #[error("expected {expected} positions, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A code character that is not a digit inside the alphabet range.
    #[error("invalid code digit {0:?}")]
    InvalidDigit(char),

    /// A stored status string that matches no known status.
    #[error("unknown status {0:?}")]
    UnknownStatus(String),
}
