//! The vault engine: fencing/insert protocol and resync protocol.

use crate::compaction;
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::sink::SyncSink;
use blockvault_store::{
    BlockRow, InsertGuard, SnapshotGuard, SnapshotRow, StoreError, StoreTransaction, VaultStore,
    Watermark,
};
use bytes::Bytes;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

/// The replication backend.
///
/// Every public operation is one bounded transaction against the backing
/// store; no state is held across calls, so a vault can be shared freely
/// across threads, and independent processes may operate on the same store
/// concurrently. The store's serializable isolation is the sole
/// mutual-exclusion mechanism.
///
/// Accept operations return `Ok(false)` when the proposal lost to a
/// concurrent or prior writer; the caller must then re-derive current
/// state rather than retry blindly. `Err` is reserved for a broken store.
///
/// # Example
///
/// ```rust
/// use blockvault_core::{BlockVault, MemoryStore, Watermark};
///
/// let vault = BlockVault::new(MemoryStore::new());
/// let accepted = vault
///     .propose_constructed_block(Watermark::new(1, 100), 0, b"payload", b"id-1", b"")
///     .unwrap();
/// assert!(accepted);
/// ```
pub struct BlockVault<S: VaultStore> {
    store: S,
    config: VaultConfig,
}

impl<S: VaultStore> BlockVault<S> {
    /// Creates a vault over `store` with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, VaultConfig::default())
    }

    /// Creates a vault over `store` with an explicit configuration.
    pub fn with_config(store: S, config: VaultConfig) -> Self {
        Self { store, config }
    }

    /// Returns the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Proposes the canonical next block, constructed by this producer.
    ///
    /// Accepted iff no existing block record fences out `watermark` on
    /// either axis and none records a LIB above `lib`. On acceptance the
    /// record's watermark is the candidate's and its block position equals
    /// `watermark.block`.
    ///
    /// Returns `Ok(true)` on globally durable acceptance, `Ok(false)` if a
    /// concurrent writer has advanced past this producer.
    ///
    /// # Errors
    ///
    /// Propagates unexpected store failures; contention-class store errors
    /// resolve to `Ok(false)`.
    pub fn propose_constructed_block(
        &self,
        watermark: Watermark,
        lib: u32,
        payload: &[u8],
        block_id: &[u8],
        previous_block_id: &[u8],
    ) -> VaultResult<bool> {
        let guard = InsertGuard::Fencing { watermark, lib };
        let row = BlockRow {
            watermark,
            lib,
            block_num: watermark.block,
            block_id: Bytes::copy_from_slice(block_id),
            previous_block_id: Bytes::copy_from_slice(previous_block_id),
            payload: blockvault_store::BlobId::new(0), // assigned in the transaction
            payload_size: payload.len() as u64,
        };
        match self.insert_block(row, guard, payload) {
            Ok(accepted) => {
                if accepted {
                    debug!(%watermark, lib, "accepted constructed block");
                } else {
                    trace!(%watermark, lib, "constructed block fenced out");
                }
                Ok(accepted)
            }
            Err(VaultError::Store(e)) if block_race_lost(&e) => {
                trace!(%watermark, lib, error = %e, "constructed block lost insert race");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Durably records a block that arrived from the network.
    ///
    /// The record's watermark is re-read as the current maximum and copied
    /// unchanged, so this call never advances the watermark. The insert
    /// is guarded only by irreversibility: it is rejected if any existing
    /// record already has a LIB at-or-above `lib`.
    ///
    /// # Errors
    ///
    /// Propagates unexpected store failures; contention-class store errors
    /// resolve to `Ok(false)`.
    pub fn append_external_block(
        &self,
        block_num: u32,
        lib: u32,
        payload: &[u8],
        block_id: &[u8],
        previous_block_id: &[u8],
    ) -> VaultResult<bool> {
        let guard = InsertGuard::Irreversibility { lib };
        let row = BlockRow {
            // Watermark is filled in from the table maximum inside the
            // transaction.
            watermark: Watermark::ZERO,
            lib,
            block_num,
            block_id: Bytes::copy_from_slice(block_id),
            previous_block_id: Bytes::copy_from_slice(previous_block_id),
            payload: blockvault_store::BlobId::new(0),
            payload_size: payload.len() as u64,
        };
        match self.insert_block(row, guard, payload) {
            Ok(accepted) => {
                if accepted {
                    debug!(block_num, lib, "recorded external block");
                } else {
                    trace!(block_num, lib, "external block rejected by irreversibility guard");
                }
                Ok(accepted)
            }
            Err(VaultError::Store(e)) if block_race_lost(&e) => {
                trace!(block_num, lib, error = %e, "external block lost insert race");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Proposes a state snapshot at `watermark`, streamed from `source`.
    ///
    /// Guarded on the watermark only: rejected if an existing snapshot is
    /// at-or-above the candidate on either axis. On acceptance the payload
    /// is streamed into the large-object space in
    /// [`VaultConfig::chunk_size`] chunks and every record superseded by
    /// the snapshot is compacted away in the same transaction.
    ///
    /// # Errors
    ///
    /// Propagates unexpected store failures and `source` I/O errors. Only
    /// the serialization-conflict class resolves to `Ok(false)` on this
    /// path; a constraint violation here propagates.
    pub fn propose_snapshot<R: Read>(
        &self,
        watermark: Watermark,
        source: R,
    ) -> VaultResult<bool> {
        match self.insert_snapshot(watermark, source) {
            Ok(accepted) => Ok(accepted),
            Err(VaultError::Store(StoreError::Serialization(message))) => {
                trace!(%watermark, %message, "snapshot proposal lost insert race");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Proposes a snapshot read from a local file.
    ///
    /// # Errors
    ///
    /// As [`BlockVault::propose_snapshot`], plus an I/O error if the file
    /// cannot be opened.
    pub fn propose_snapshot_file(&self, watermark: Watermark, path: &Path) -> VaultResult<bool> {
        let file = File::open(path)?;
        self.propose_snapshot(watermark, BufReader::new(file))
    }

    /// Serves a follower's catch-up request.
    ///
    /// Chooses between incremental block streaming and full
    /// snapshot-plus-blocks bootstrap, pushing data out through `sink`:
    ///
    /// 1. A non-empty `known_previous_block_id` that some record lists as
    ///    its predecessor starts incremental catch-up from the earliest
    ///    watermark paired with it: every record at-or-above that point on
    ///    both axes is streamed in block-position order. No snapshot.
    /// 2. If instead the id matches a stored block exactly, the follower
    ///    is already caught up and nothing is invoked.
    /// 3. Otherwise (unknown ancestor, or empty id): full bootstrap. The
    ///    latest snapshot if any, then every remaining block in
    ///    block-position order.
    ///
    /// Read-only: runs in a single read transaction and never mutates the
    /// store. Records accepted after the transaction starts are picked up
    /// by a later call.
    ///
    /// # Errors
    ///
    /// Propagates store failures and sink errors.
    pub fn sync(&self, known_previous_block_id: &[u8], sink: &mut dyn SyncSink) -> VaultResult<()> {
        let txn = self.store.read_only()?;

        if !known_previous_block_id.is_empty() {
            let start = txn
                .blocks()?
                .iter()
                .filter(|b| b.previous_block_id.as_ref() == known_previous_block_id)
                .map(|b| b.watermark)
                .min();

            if let Some(start) = start {
                let mut rows: Vec<BlockRow> = txn
                    .blocks()?
                    .into_iter()
                    .filter(|b| b.watermark.at_least(start))
                    .collect();
                rows.sort_by_key(|b| b.block_num);
                debug!(%start, count = rows.len(), "incremental catch-up");
                return self.stream_blocks(txn.as_ref(), &rows, sink);
            }

            if txn.has_block(known_previous_block_id)? {
                // Follower already holds the head block: nothing to sync.
                trace!("follower up to date");
                return Ok(());
            }
        }

        // Ancestor unknown or no history supplied: full bootstrap.
        let latest = txn.snapshots()?.into_iter().max_by_key(|s| s.watermark);
        if let Some(snapshot) = latest {
            let spill = self.spill_blob(txn.as_ref(), snapshot.payload)?;
            debug!(watermark = %snapshot.watermark, "bootstrapping from snapshot");
            sink.on_snapshot(spill.path())?;
        }

        let mut rows = txn.blocks()?;
        rows.sort_by_key(|b| b.block_num);
        debug!(count = rows.len(), "bootstrap block replay");
        self.stream_blocks(txn.as_ref(), &rows, sink)
    }

    /// Shared insert path for both block operations: allocate the payload
    /// blob, guarded insert, confirm by point read, then write the payload.
    fn insert_block(
        &self,
        mut row: BlockRow,
        guard: InsertGuard,
        payload: &[u8],
    ) -> VaultResult<bool> {
        let mut txn = self.store.serializable()?;

        let blob = txn.create_blob()?;
        row.payload = blob;
        if matches!(guard, InsertGuard::Irreversibility { .. }) {
            row.watermark = current_watermark(txn.as_ref())?;
        }
        txn.insert_block_if(row, &guard)?;

        // The guarded insert inserts zero rows silently; only the point
        // read tells whether this proposal took effect.
        if txn.block_by_payload(blob)?.is_none() {
            return Ok(false);
        }

        txn.append_blob(blob, payload)?;
        txn.commit()?;
        Ok(true)
    }

    fn insert_snapshot<R: Read>(&self, watermark: Watermark, mut source: R) -> VaultResult<bool> {
        let mut txn = self.store.serializable()?;

        let blob = txn.create_blob()?;
        let row = SnapshotRow {
            watermark,
            payload: blob,
        };
        txn.insert_snapshot_if(row, &SnapshotGuard { watermark })?;

        if txn.snapshot_by_payload(blob)?.is_none() {
            // The payload handle was allocated ahead of the guard; on a
            // store whose allocations escape rollback it is now orphaned.
            warn!(%watermark, blob = %blob, "snapshot proposal rejected; payload handle released");
            return Ok(false);
        }

        let mut chunk = vec![0u8; self.config.chunk_size.max(1)];
        loop {
            let n = source.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            txn.append_blob(blob, &chunk[..n])?;
        }

        let stats = compaction::purge_superseded(txn.as_mut(), watermark)?;
        txn.commit()?;
        debug!(
            %watermark,
            blocks = stats.blocks_purged,
            snapshots = stats.snapshots_purged,
            bytes = stats.bytes_reclaimed,
            "accepted snapshot and compacted superseded records"
        );
        Ok(true)
    }

    fn stream_blocks(
        &self,
        txn: &dyn StoreTransaction,
        rows: &[BlockRow],
        sink: &mut dyn SyncSink,
    ) -> VaultResult<()> {
        for row in rows {
            let payload = self.read_blob(txn, row)?;
            sink.on_block(&payload)?;
        }
        Ok(())
    }

    fn read_blob(&self, txn: &dyn StoreTransaction, row: &BlockRow) -> VaultResult<Vec<u8>> {
        let chunk_size = self.config.chunk_size.max(1);
        let mut payload = Vec::with_capacity(row.payload_size as usize);
        let mut offset = 0u64;
        loop {
            let chunk = txn.read_blob(row.payload, offset, chunk_size)?;
            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as u64;
            payload.extend_from_slice(&chunk);
        }
        Ok(payload)
    }

    /// Materializes a blob into a temporary file for the snapshot hand-off.
    fn spill_blob(
        &self,
        txn: &dyn StoreTransaction,
        blob: blockvault_store::BlobId,
    ) -> VaultResult<tempfile::NamedTempFile> {
        let chunk_size = self.config.chunk_size.max(1);
        let mut file = tempfile::NamedTempFile::new()?;
        let mut offset = 0u64;
        loop {
            let chunk = txn.read_blob(blob, offset, chunk_size)?;
            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as u64;
            file.write_all(&chunk)?;
        }
        file.flush()?;
        Ok(file)
    }
}

/// Derives the current watermark as the per-axis maximum over the block
/// table, or the origin when the table is empty.
fn current_watermark(txn: &dyn StoreTransaction) -> VaultResult<Watermark> {
    Ok(txn
        .blocks()?
        .iter()
        .fold(Watermark::ZERO, |acc, b| acc.max_axes(b.watermark)))
}

/// The contention classes the block-insert paths resolve to a lost race.
///
/// Broader than the snapshot path on purpose: a duplicate block id from a
/// concurrent identical proposal lands here as a constraint violation.
fn block_race_lost(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Serialization(_) | StoreError::Constraint(_)
    )
}
