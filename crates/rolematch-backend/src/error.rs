//! Backend error types.

use std::io;

use rolematch_types::DocumentKey;
use thiserror::Error;

/// Document store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write was based on a version other than the stored one.
    #[error("version conflict on {key}: write based on v{expected}, store has v{actual}")]
    VersionConflict {
        key: DocumentKey,
        expected: u64,
        actual: u64,
    },

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored payload could not be encoded or decoded.
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// Store result type.
pub type StoreResult<T> = Result<T, StoreError>;

/// Auth provider error type.
///
/// Display strings are shown to the user verbatim by the sign-in flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail(String),

    #[error("Email link is invalid or has expired")]
    InvalidToken,

    #[error("Email link is invalid or has expired")]
    ExpiredToken,

    #[error("Error sending magic link email: {0}")]
    Mailer(String),

    #[error("auth provider unavailable: {0}")]
    Unavailable(String),

    #[error("auth state I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("auth state is corrupt: {0}")]
    State(#[from] serde_json::Error),
}

/// Auth result type.
pub type AuthResult<T> = Result<T, AuthError>;
