//! Error types for the vault engine.

use blockvault_store::StoreError;
use std::io;
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur during vault operations.
///
/// Losing a race to a concurrent writer is **not** an error: the accept
/// operations surface it as `Ok(false)`. These variants are the failures a
/// caller must handle at process level (retry loop or fatal abort).
#[derive(Debug, Error)]
pub enum VaultError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Reading a snapshot source or writing a hand-off file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A sync sink reported a failure.
    #[error("sync sink error: {0}")]
    Sink(String),
}

impl VaultError {
    /// Creates a sink error, for [`crate::SyncSink`] implementations.
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = VaultError::sink("disk full");
        assert_eq!(err.to_string(), "sync sink error: disk full");

        let err = VaultError::from(StoreError::ReadOnly);
        assert!(err.to_string().starts_with("store error"));
    }
}
