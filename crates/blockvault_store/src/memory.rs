//! In-memory store for testing and ephemeral vaults.

use crate::adapter::{StoreTransaction, VaultStore};
use crate::error::{StoreError, StoreResult};
use crate::tables::VaultTables;
use crate::types::{BlobId, BlockRow, InsertGuard, SnapshotGuard, SnapshotRow};
use parking_lot::{Mutex, MutexGuard};

/// An in-memory vault store.
///
/// All state lives behind a single mutex; a transaction holds the lock for
/// its whole lifetime, which makes every transaction trivially serializable.
/// Competing writers block rather than abort, so this store never emits
/// [`StoreError::Serialization`] itself.
///
/// Suitable for unit tests, integration tests, and ephemeral vaults.
///
/// # Example
///
/// ```rust
/// use blockvault_store::{MemoryStore, StoreTransaction, VaultStore};
///
/// let store = MemoryStore::new();
/// let txn = store.serializable().unwrap();
/// assert!(txn.blocks().unwrap().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<VaultTables>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaultStore for MemoryStore {
    fn serializable(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        let guard = self.tables.lock();
        let baseline = Some(guard.clone());
        Ok(Box::new(MemoryTxn {
            tables: guard,
            baseline,
            writable: true,
            committed: false,
        }))
    }

    fn read_only(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(MemoryTxn {
            tables: self.tables.lock(),
            baseline: None,
            writable: false,
            committed: false,
        }))
    }
}

struct MemoryTxn<'a> {
    tables: MutexGuard<'a, VaultTables>,
    /// State at transaction begin, restored on rollback.
    baseline: Option<VaultTables>,
    writable: bool,
    committed: bool,
}

impl MemoryTxn<'_> {
    fn writable(&mut self) -> StoreResult<&mut VaultTables> {
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        Ok(&mut self.tables)
    }
}

impl Drop for MemoryTxn<'_> {
    fn drop(&mut self) {
        if self.writable && !self.committed {
            if let Some(baseline) = self.baseline.take() {
                *self.tables = baseline;
            }
        }
    }
}

impl StoreTransaction for MemoryTxn<'_> {
    fn blocks(&self) -> StoreResult<Vec<BlockRow>> {
        Ok(self.tables.blocks())
    }

    fn snapshots(&self) -> StoreResult<Vec<SnapshotRow>> {
        Ok(self.tables.snapshots())
    }

    fn has_block(&self, block_id: &[u8]) -> StoreResult<bool> {
        Ok(self.tables.has_block(block_id))
    }

    fn block_by_payload(&self, payload: BlobId) -> StoreResult<Option<BlockRow>> {
        Ok(self.tables.block_by_payload(payload))
    }

    fn snapshot_by_payload(&self, payload: BlobId) -> StoreResult<Option<SnapshotRow>> {
        Ok(self.tables.snapshot_by_payload(payload))
    }

    fn insert_block_if(&mut self, row: BlockRow, guard: &InsertGuard) -> StoreResult<()> {
        self.writable()?.insert_block_if(row, guard)
    }

    fn insert_snapshot_if(&mut self, row: SnapshotRow, guard: &SnapshotGuard) -> StoreResult<()> {
        self.writable()?.insert_snapshot_if(row, guard)
    }

    fn delete_block(&mut self, block_id: &[u8]) -> StoreResult<()> {
        self.writable()?.delete_block(block_id);
        Ok(())
    }

    fn delete_snapshot(&mut self, payload: BlobId) -> StoreResult<()> {
        self.writable()?.delete_snapshot(payload);
        Ok(())
    }

    fn create_blob(&mut self) -> StoreResult<BlobId> {
        Ok(self.writable()?.create_blob())
    }

    fn append_blob(&mut self, id: BlobId, chunk: &[u8]) -> StoreResult<()> {
        self.writable()?.append_blob(id, chunk)
    }

    fn read_blob(&self, id: BlobId, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        self.tables.read_blob(id, offset, len)
    }

    fn blob_size(&self, id: BlobId) -> StoreResult<u64> {
        self.tables.blob_size(id)
    }

    fn unlink_blob(&mut self, id: BlobId) -> StoreResult<()> {
        self.writable()?.unlink_blob(id)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.committed = true;
        Ok(())
    }
}
