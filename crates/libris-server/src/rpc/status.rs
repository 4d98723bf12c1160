//! Canonical status codes carried across service boundaries.

use thiserror::Error;

use libris_domain::cache::CacheError;
use libris_storage::StorageError;

/// Canonical error codes, independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    /// Target row does not exist.
    NotFound,
    /// Unique-key violation, or an operation that would recreate existing
    /// state.
    AlreadyExists,
    /// A state-machine precondition failed (returning an already-returned
    /// borrow).
    FailedPrecondition,
    /// A step of a compensable workflow failed before the commit point;
    /// compensation was attempted.
    Aborted,
    /// Unexpected store/cache/RPC failure.
    Internal,
    /// Transient failure worth retrying; used by background retry loops and
    /// never surfaced to clients.
    Unavailable,
}

/// An RPC status: canonical code plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Status {
    pub code: Code,
    pub message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(Code::AlreadyExists, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(Code::FailedPrecondition, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(Code::Aborted, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }
}

impl From<StorageError> for Status {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotFound { .. } => Status::not_found(err.to_string()),
            StorageError::Duplicate { .. } => Status::already_exists(err.to_string()),
            StorageError::PreconditionFailed { .. } => Status::aborted(err.to_string()),
            StorageError::Query { .. }
            | StorageError::Serialization { .. }
            | StorageError::Internal { .. } => Status::internal(err.to_string()),
        }
    }
}

impl From<CacheError> for Status {
    fn from(err: CacheError) -> Self {
        // Cache failures never decide a request on their own; by the time
        // one becomes a status the authoritative path has already failed.
        Status::internal(err.to_string())
    }
}
