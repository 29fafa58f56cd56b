//! Row, watermark, and guard types shared by all store implementations.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A two-dimensional monotonic position marker used as a fencing token.
///
/// The watermark tracks a block axis and a timestamp axis. There is no
/// stored "current" watermark; it is always derived as the per-axis maximum
/// over the block table (see [`Watermark::max_axes`]).
///
/// The derived `Ord` is lexicographic (block, then timestamp), which is the
/// ordering used to pick the "earliest" resync start point and the "latest"
/// snapshot.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Watermark {
    /// Block position axis.
    pub block: u32,
    /// Timestamp position axis.
    pub timestamp: u32,
}

impl Watermark {
    /// The origin watermark, used when the block table is empty.
    pub const ZERO: Watermark = Watermark {
        block: 0,
        timestamp: 0,
    };

    /// Creates a watermark from its two axes.
    #[must_use]
    pub const fn new(block: u32, timestamp: u32) -> Self {
        Self { block, timestamp }
    }

    /// Returns true if this stored watermark fences out `candidate`:
    /// at-or-above the candidate on **either** axis.
    ///
    /// A proposer loses if it is behind on any axis, not just one.
    #[must_use]
    pub fn fences(&self, candidate: Watermark) -> bool {
        self.block >= candidate.block || self.timestamp >= candidate.timestamp
    }

    /// Returns true if this watermark is at-or-below `bound` on either axis.
    ///
    /// This is the inclusive bound used to purge block records once a
    /// snapshot at `bound` exists.
    #[must_use]
    pub fn dominated_by(&self, bound: Watermark) -> bool {
        self.block <= bound.block || self.timestamp <= bound.timestamp
    }

    /// Returns true if this watermark is strictly below `bound` on either
    /// axis.
    ///
    /// This is the strict bound used to purge superseded snapshots while
    /// keeping the one just accepted at `bound`.
    #[must_use]
    pub fn strictly_below(&self, bound: Watermark) -> bool {
        self.block < bound.block || self.timestamp < bound.timestamp
    }

    /// Returns true if this watermark is at-or-above `start` on **both**
    /// axes (the incremental resync window).
    #[must_use]
    pub fn at_least(&self, start: Watermark) -> bool {
        self.block >= start.block && self.timestamp >= start.timestamp
    }

    /// Per-axis maximum of two watermarks.
    #[must_use]
    pub fn max_axes(self, other: Watermark) -> Watermark {
        Watermark {
            block: self.block.max(other.block),
            timestamp: self.timestamp.max(other.timestamp),
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block, self.timestamp)
    }
}

/// Handle to a large object in the store's blob space.
///
/// Handles are unique per store and never reused within its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlobId(u64);

impl BlobId {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A durably accepted block record.
///
/// Rows are immutable once inserted; they are removed only by compaction
/// after a superseding snapshot is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRow {
    /// Watermark at acceptance time.
    pub watermark: Watermark,
    /// Last irreversible block number at acceptance time.
    pub lib: u32,
    /// Block position number.
    pub block_num: u32,
    /// Globally unique block identifier (opaque bytes).
    pub block_id: Bytes,
    /// Identifier of the preceding block (opaque bytes, backward chain).
    pub previous_block_id: Bytes,
    /// Large-object handle of the block payload.
    pub payload: BlobId,
    /// Payload size in bytes, recorded at insert time.
    pub payload_size: u64,
}

/// A durably accepted snapshot record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Watermark at creation time.
    pub watermark: Watermark,
    /// Large-object handle of the snapshot payload.
    pub payload: BlobId,
}

/// Condition evaluated atomically with a block insert.
///
/// The insert is a silent no-op when any existing block row rejects it;
/// callers detect acceptance with a follow-up point read by payload handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertGuard {
    /// Full fencing check for a locally constructed block: an existing row
    /// at-or-above the candidate watermark on either axis, or with a LIB
    /// strictly above the candidate's, rejects the insert.
    Fencing {
        /// Candidate watermark.
        watermark: Watermark,
        /// Candidate last-irreversible-block number.
        lib: u32,
    },
    /// Irreversibility-only check for an externally sourced block: an
    /// existing row whose LIB is at-or-above the supplied LIB rejects the
    /// insert.
    Irreversibility {
        /// Supplied last-irreversible-block number.
        lib: u32,
    },
}

impl InsertGuard {
    /// Returns true if `existing` rejects an insert under this guard.
    #[must_use]
    pub fn rejects(&self, existing: &BlockRow) -> bool {
        match *self {
            InsertGuard::Fencing { watermark, lib } => {
                existing.watermark.fences(watermark) || existing.lib > lib
            }
            InsertGuard::Irreversibility { lib } => existing.lib >= lib,
        }
    }
}

/// Condition evaluated atomically with a snapshot insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotGuard {
    /// Candidate watermark.
    pub watermark: Watermark,
}

impl SnapshotGuard {
    /// Returns true if `existing` rejects an insert under this guard:
    /// an existing snapshot at-or-above the candidate on either axis.
    #[must_use]
    pub fn rejects(&self, existing: &SnapshotRow) -> bool {
        existing.watermark.fences(self.watermark)
    }
}
