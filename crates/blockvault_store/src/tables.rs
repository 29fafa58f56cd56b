//! Shared table/blob state backing the provided store implementations.
//!
//! `VaultTables` is the logical schema: a block table, a snapshot table,
//! and a blob space keyed by handle. [`super::MemoryStore`] keeps one
//! instance behind a mutex; [`super::FileStore`] decodes one per
//! transaction and rewrites it on commit.

use crate::error::{StoreError, StoreResult};
use crate::types::{BlobId, BlockRow, InsertGuard, SnapshotGuard, SnapshotRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The vault schema: both tables plus the large-object space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct VaultTables {
    blocks: Vec<BlockRow>,
    snapshots: Vec<SnapshotRow>,
    blobs: BTreeMap<u64, Vec<u8>>,
    next_blob: u64,
}

impl VaultTables {
    /// Creates the empty schema.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn blocks(&self) -> Vec<BlockRow> {
        self.blocks.clone()
    }

    pub(crate) fn snapshots(&self) -> Vec<SnapshotRow> {
        self.snapshots.clone()
    }

    pub(crate) fn has_block(&self, block_id: &[u8]) -> bool {
        self.blocks.iter().any(|b| b.block_id.as_ref() == block_id)
    }

    pub(crate) fn block_by_payload(&self, payload: BlobId) -> Option<BlockRow> {
        self.blocks.iter().find(|b| b.payload == payload).cloned()
    }

    pub(crate) fn snapshot_by_payload(&self, payload: BlobId) -> Option<SnapshotRow> {
        self.snapshots.iter().find(|s| s.payload == payload).copied()
    }

    pub(crate) fn insert_block_if(
        &mut self,
        row: BlockRow,
        guard: &InsertGuard,
    ) -> StoreResult<()> {
        if self.blocks.iter().any(|existing| guard.rejects(existing)) {
            // Guard matched: zero rows inserted, reported as success.
            return Ok(());
        }
        if self.has_block(row.block_id.as_ref()) {
            return Err(StoreError::constraint(format!(
                "block id {:02x?} already exists",
                row.block_id.as_ref()
            )));
        }
        self.blocks.push(row);
        Ok(())
    }

    pub(crate) fn insert_snapshot_if(
        &mut self,
        row: SnapshotRow,
        guard: &SnapshotGuard,
    ) -> StoreResult<()> {
        if self.snapshots.iter().any(|existing| guard.rejects(existing)) {
            return Ok(());
        }
        self.snapshots.push(row);
        Ok(())
    }

    pub(crate) fn delete_block(&mut self, block_id: &[u8]) {
        self.blocks.retain(|b| b.block_id.as_ref() != block_id);
    }

    pub(crate) fn delete_snapshot(&mut self, payload: BlobId) {
        self.snapshots.retain(|s| s.payload != payload);
    }

    pub(crate) fn create_blob(&mut self) -> BlobId {
        let id = self.next_blob;
        self.next_blob += 1;
        self.blobs.insert(id, Vec::new());
        BlobId::new(id)
    }

    pub(crate) fn append_blob(&mut self, id: BlobId, chunk: &[u8]) -> StoreResult<()> {
        let blob = self
            .blobs
            .get_mut(&id.as_u64())
            .ok_or(StoreError::BlobMissing(id))?;
        blob.extend_from_slice(chunk);
        Ok(())
    }

    pub(crate) fn read_blob(&self, id: BlobId, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        let blob = self
            .blobs
            .get(&id.as_u64())
            .ok_or(StoreError::BlobMissing(id))?;
        let start = (offset as usize).min(blob.len());
        let end = start.saturating_add(len).min(blob.len());
        Ok(blob[start..end].to_vec())
    }

    pub(crate) fn blob_size(&self, id: BlobId) -> StoreResult<u64> {
        let blob = self
            .blobs
            .get(&id.as_u64())
            .ok_or(StoreError::BlobMissing(id))?;
        Ok(blob.len() as u64)
    }

    pub(crate) fn unlink_blob(&mut self, id: BlobId) -> StoreResult<()> {
        self.blobs
            .remove(&id.as_u64())
            .map(|_| ())
            .ok_or(StoreError::BlobMissing(id))
    }
}
