//! Error types for document store operations.

use thiserror::Error;

/// Result type for document store operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Document store errors.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A unique index rejected an insert. Carries the index name so the
    /// caller can tell an expected collision from a schema fault.
    #[error("duplicate key on index '{index}'")]
    DuplicateKey {
        /// Name of the violated index.
        index: String,
    },

    /// The store is unreachable or the connection dropped mid-operation.
    #[error("connection error: {0}")]
    Connection(String),

    /// A document failed structural validation.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Index creation or lookup failed.
    #[error("index error: {0}")]
    Index(String),
}
