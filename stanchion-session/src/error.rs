//! Error types for session operations.

use stanchion_document::DocumentError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
///
/// An unacknowledged write is deliberately *not* an error: `write`,
/// `destroy`, and `gc` report it as `Ok(false)` so the host request can
/// continue degraded instead of crashing. Everything here aborts the
/// operation that raised it.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Fatal configuration problem at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The lock wait budget for a session id was exhausted.
    #[error("timed out acquiring session lock for '{0}'")]
    LockTimeout(String),

    /// Document store fault the retry loop cannot reason about.
    #[error("document store error: {0}")]
    Store(#[from] DocumentError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
