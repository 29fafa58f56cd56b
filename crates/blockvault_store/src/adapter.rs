//! Store adapter trait definitions.

use crate::error::StoreResult;
use crate::types::{BlobId, BlockRow, InsertGuard, SnapshotGuard, SnapshotRow};

/// A transactional store holding the vault's two tables and blob space.
///
/// The store is the single shared mutable resource of the system; its
/// transaction isolation is the sole mutual-exclusion mechanism among
/// competing writer processes. Implementations must be safe to call from
/// multiple threads (and, for persistent stores, multiple processes) with
/// no shared memory beyond the store itself.
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent vaults
pub trait VaultStore: Send + Sync {
    /// Begins a serializable read-write transaction.
    ///
    /// May block while another transaction holds the store. Dropping the
    /// returned transaction without committing rolls back every change made
    /// through it, including blob allocations.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be established.
    fn serializable(&self) -> StoreResult<Box<dyn StoreTransaction + '_>>;

    /// Begins a read-only transaction with a consistent view of the store.
    ///
    /// Mutating methods on the returned transaction fail with
    /// [`crate::StoreError::ReadOnly`].
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be established.
    fn read_only(&self) -> StoreResult<Box<dyn StoreTransaction + '_>>;
}

/// A single bounded transaction against a [`VaultStore`].
///
/// # Invariants
///
/// - Guarded inserts evaluate their condition atomically with the insert
///   and are a **silent no-op** when the guard fails; acceptance is
///   detected by re-reading the row by its payload handle
/// - Table scans return rows in unspecified order; callers filter and sort
/// - Blob handles allocated in an uncommitted transaction do not survive
///   its rollback
pub trait StoreTransaction {
    /// Returns every block row.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn blocks(&self) -> StoreResult<Vec<BlockRow>>;

    /// Returns every snapshot row.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn snapshots(&self) -> StoreResult<Vec<SnapshotRow>>;

    /// Returns true if a block row with this exact id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn has_block(&self, block_id: &[u8]) -> StoreResult<bool>;

    /// Point read of a block row by its payload handle.
    ///
    /// This is the acceptance probe after a guarded insert: an empty result
    /// means the insert matched zero rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn block_by_payload(&self, payload: BlobId) -> StoreResult<Option<BlockRow>>;

    /// Point read of a snapshot row by its payload handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn snapshot_by_payload(&self, payload: BlobId) -> StoreResult<Option<SnapshotRow>>;

    /// Inserts a block row unless an existing row rejects it under `guard`.
    ///
    /// A rejected insert is not an error; it simply inserts nothing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Constraint`] if the row's `block_id`
    /// already exists, or another error if the insert fails structurally.
    fn insert_block_if(&mut self, row: BlockRow, guard: &InsertGuard) -> StoreResult<()>;

    /// Inserts a snapshot row unless an existing row rejects it under
    /// `guard`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails structurally.
    fn insert_snapshot_if(&mut self, row: SnapshotRow, guard: &SnapshotGuard) -> StoreResult<()>;

    /// Deletes the block row with this id, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_block(&mut self, block_id: &[u8]) -> StoreResult<()>;

    /// Deletes the snapshot row with this payload handle, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_snapshot(&mut self, payload: BlobId) -> StoreResult<()>;

    /// Allocates a new, empty large object and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation fails.
    fn create_blob(&mut self) -> StoreResult<BlobId>;

    /// Appends a chunk to a large object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::BlobMissing`] if the handle is unknown.
    fn append_blob(&mut self, id: BlobId, chunk: &[u8]) -> StoreResult<()>;

    /// Reads up to `len` bytes of a large object starting at `offset`.
    ///
    /// A read past the end returns the available prefix (possibly empty);
    /// sequential chunked reads terminate on an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::BlobMissing`] if the handle is unknown.
    fn read_blob(&self, id: BlobId, offset: u64, len: usize) -> StoreResult<Vec<u8>>;

    /// Returns the current size of a large object in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::BlobMissing`] if the handle is unknown.
    fn blob_size(&self, id: BlobId) -> StoreResult<u64>;

    /// Unlinks a large object, releasing its storage.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::BlobMissing`] if the handle is unknown.
    fn unlink_blob(&mut self, id: BlobId) -> StoreResult<()>;

    /// Commits the transaction, making every change durable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Serialization`] if the transaction lost
    /// a conflict, or an I/O error if durability cannot be guaranteed.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}
