//! Callback sink for the resync protocol.

use crate::error::VaultResult;
use std::path::Path;

/// Caller-supplied sink receiving resynchronization data.
///
/// Per [`crate::BlockVault::sync`] invocation the call order is fixed:
/// at most one [`SyncSink::on_snapshot`], followed by zero or more
/// [`SyncSink::on_block`] calls in ascending block-position order.
///
/// A sink error aborts the sync and propagates to the caller.
pub trait SyncSink {
    /// Receives one block payload.
    ///
    /// # Errors
    ///
    /// Returns an error to abort the sync.
    fn on_block(&mut self, payload: &[u8]) -> VaultResult<()>;

    /// Receives the latest snapshot, materialized into a temporary file.
    ///
    /// The file is removed after this returns; the sink must copy or
    /// consume it within the call.
    ///
    /// # Errors
    ///
    /// Returns an error to abort the sync.
    fn on_snapshot(&mut self, snapshot: &Path) -> VaultResult<()>;
}
