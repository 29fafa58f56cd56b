//! Error types for store operations.

use crate::types::BlobId;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// `Serialization` and `Constraint` are the classes expected under writer
/// contention; the protocol layer maps them to a rejected proposal. All
/// other variants indicate a broken store and always propagate.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transaction lost a serialization conflict and was rolled back.
    #[error("serialization conflict: {0}")]
    Serialization(String),

    /// An integrity constraint was violated (e.g. duplicate block id).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The store file or state is corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// A mutation was attempted inside a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnly,

    /// A large object was referenced that does not exist.
    #[error("unknown large object: {0}")]
    BlobMissing(BlobId),
}

impl StoreError {
    /// Creates a serialization conflict error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Creates a constraint violation error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}
