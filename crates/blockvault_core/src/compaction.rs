//! Retention: purge of records superseded by an accepted snapshot.
//!
//! Compaction runs only inside the transaction that accepted the snapshot,
//! so a visible snapshot always implies its compaction completed.
//!
//! ## Invariants
//!
//! - Block rows at-or-below the snapshot watermark on **either** axis are
//!   purged (inclusive bound: blocks *at* the watermark are superseded by
//!   the snapshot itself)
//! - Snapshot rows strictly below the watermark on either axis are purged
//!   (strict bound: exactly the new snapshot survives)
//! - Payload blobs are unlinked before their owning rows are deleted,
//!   in the same transaction

use blockvault_store::{StoreResult, StoreTransaction, Watermark};

/// Statistics from one compaction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Block rows purged.
    pub blocks_purged: usize,
    /// Snapshot rows purged.
    pub snapshots_purged: usize,
    /// Payload bytes reclaimed from the large-object space.
    pub bytes_reclaimed: u64,
}

impl CompactionStats {
    /// Returns true if the pass removed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks_purged == 0 && self.snapshots_purged == 0
    }
}

/// Purges every record superseded by a snapshot accepted at `watermark`.
///
/// Any failure propagates and aborts the caller's transaction, rolling
/// back the snapshot acceptance with it.
pub(crate) fn purge_superseded(
    txn: &mut dyn StoreTransaction,
    watermark: Watermark,
) -> StoreResult<CompactionStats> {
    let mut stats = CompactionStats::default();

    for row in txn.blocks()? {
        if row.watermark.dominated_by(watermark) {
            stats.bytes_reclaimed += txn.blob_size(row.payload)?;
            txn.unlink_blob(row.payload)?;
            txn.delete_block(row.block_id.as_ref())?;
            stats.blocks_purged += 1;
        }
    }

    for snapshot in txn.snapshots()? {
        if snapshot.watermark.strictly_below(watermark) {
            stats.bytes_reclaimed += txn.blob_size(snapshot.payload)?;
            txn.unlink_blob(snapshot.payload)?;
            txn.delete_snapshot(snapshot.payload)?;
            stats.snapshots_purged += 1;
        }
    }

    Ok(stats)
}
