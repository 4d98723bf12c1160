//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Target row does not exist (or did not match an update filter).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique-key violation.
    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// A conditional write found the row in a different state than
    /// expected (e.g. claiming a book that is already borrowed).
    #[error("{entity} {id} failed precondition: {message}")]
    PreconditionFailed {
        entity: &'static str,
        id: String,
        message: String,
    },

    /// Query construction or execution failed.
    #[error("query error: {message}")]
    Query { message: String },

    /// Row encoding or decoding failed.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Unexpected backend failure.
    #[error("internal storage error: {message}")]
    Internal { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
