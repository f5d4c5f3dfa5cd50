//! Error types for the storage layer.

/// Errors returned by a [`Store`](crate::Store) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend itself failed: I/O, a poisoned lock, a bad query.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// An insert would break a uniqueness rule (duplicate room code, a
    /// second game for a room, a second move for the same round).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be turned back into a record.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns `true` for a uniqueness violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
