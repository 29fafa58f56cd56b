//! Integration tests for the vault engine.

use blockvault_core::{BlockVault, MemoryStore, SyncSink, VaultError, VaultResult, Watermark};
use blockvault_store::{
    BlobId, BlockRow, InsertGuard, SnapshotGuard, SnapshotRow, StoreError, StoreResult,
    StoreTransaction, VaultStore,
};
use std::path::Path;
use std::sync::Arc;

/// One callback invocation, in arrival order.
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Snapshot(Vec<u8>),
    Block(Vec<u8>),
}

/// Records every callback for later inspection.
#[derive(Default)]
struct RecordingSink {
    events: Vec<Event>,
}

impl RecordingSink {
    fn blocks(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Block(payload) => Some(payload.clone()),
                Event::Snapshot(_) => None,
            })
            .collect()
    }

    fn snapshots(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Snapshot(payload) => Some(payload.clone()),
                Event::Block(_) => None,
            })
            .collect()
    }
}

impl SyncSink for RecordingSink {
    fn on_block(&mut self, payload: &[u8]) -> VaultResult<()> {
        self.events.push(Event::Block(payload.to_vec()));
        Ok(())
    }

    fn on_snapshot(&mut self, snapshot: &Path) -> VaultResult<()> {
        self.events.push(Event::Snapshot(std::fs::read(snapshot)?));
        Ok(())
    }
}

fn sync_events(vault: &BlockVault<MemoryStore>, ancestor: &[u8]) -> Vec<Event> {
    let mut sink = RecordingSink::default();
    vault.sync(ancestor, &mut sink).unwrap();
    sink.events
}

#[test]
fn concurrent_incomparable_proposals_have_one_winner() {
    let vault = Arc::new(BlockVault::new(MemoryStore::new()));

    // Neither watermark dominates the other, and neither is fenced by the
    // (empty) stored maximum.
    let candidates = [Watermark::new(10, 1001), Watermark::new(11, 1000)];
    let mut handles = Vec::new();
    for (i, watermark) in candidates.into_iter().enumerate() {
        let vault = Arc::clone(&vault);
        handles.push(std::thread::spawn(move || {
            let id = format!("candidate-{i}");
            vault
                .propose_constructed_block(watermark, 0, b"payload", id.as_bytes(), b"")
                .unwrap()
        }));
    }

    let accepted: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(accepted.iter().filter(|&&won| won).count(), 1);

    let txn = vault.store().read_only().unwrap();
    assert_eq!(txn.blocks().unwrap().len(), 1);
}

#[test]
fn same_watermark_concurrent_proposals_have_one_winner() {
    let vault = Arc::new(BlockVault::new(MemoryStore::new()));

    let mut handles = Vec::new();
    for i in 0..2 {
        let vault = Arc::clone(&vault);
        handles.push(std::thread::spawn(move || {
            let id = format!("candidate-{i}");
            let payload = format!("content-{i}");
            vault
                .propose_constructed_block(
                    Watermark::new(10, 1000),
                    0,
                    payload.as_bytes(),
                    id.as_bytes(),
                    b"",
                )
                .unwrap()
        }));
    }

    let accepted: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(accepted.iter().filter(|&&won| won).count(), 1);
}

#[test]
fn dominated_proposals_are_rejected_without_a_record() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(10, 1000), 5, b"head", b"head", b"")
        .unwrap());

    // Behind on the block axis.
    assert!(!vault
        .propose_constructed_block(Watermark::new(9, 2000), 5, b"x", b"late-1", b"")
        .unwrap());
    // Behind on the timestamp axis.
    assert!(!vault
        .propose_constructed_block(Watermark::new(11, 900), 5, b"x", b"late-2", b"")
        .unwrap());
    // Ahead on both axes but behind on LIB.
    assert!(!vault
        .propose_constructed_block(Watermark::new(11, 1001), 4, b"x", b"late-3", b"")
        .unwrap());

    let txn = vault.store().read_only().unwrap();
    assert_eq!(txn.blocks().unwrap().len(), 1);
}

#[test]
fn external_block_never_advances_the_watermark() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(7, 700), 3, b"head", b"head", b"")
        .unwrap());
    assert!(vault
        .append_external_block(8, 4, b"ext", b"ext-1", b"head")
        .unwrap());

    let txn = vault.store().read_only().unwrap();
    let derived = txn
        .blocks()
        .unwrap()
        .iter()
        .fold(Watermark::ZERO, |acc, b| acc.max_axes(b.watermark));
    assert_eq!(derived, Watermark::new(7, 700));
}

#[test]
fn external_block_is_rejected_when_lib_regresses() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(7, 700), 5, b"head", b"head", b"")
        .unwrap());

    // An existing record already has LIB >= the supplied LIB.
    assert!(!vault
        .append_external_block(8, 5, b"ext", b"ext-1", b"head")
        .unwrap());
    assert!(vault
        .append_external_block(8, 6, b"ext", b"ext-2", b"head")
        .unwrap());
}

#[test]
fn snapshot_acceptance_compacts_superseded_records() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(5, 500), 0, b"b1", b"b1", b"")
        .unwrap());
    assert!(vault
        .propose_constructed_block(Watermark::new(20, 2000), 0, b"b2", b"b2", b"b1")
        .unwrap());
    assert!(vault
        .propose_snapshot(Watermark::new(20, 2000), &b"snapshot state"[..])
        .unwrap());

    // Both blocks were at-or-below the snapshot watermark.
    let events = sync_events(&vault, b"");
    assert_eq!(events, vec![Event::Snapshot(b"snapshot state".to_vec())]);
}

#[test]
fn exactly_one_snapshot_survives_acceptance() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_snapshot(Watermark::new(10, 1000), &b"first"[..])
        .unwrap());
    assert!(vault
        .propose_constructed_block(Watermark::new(15, 1500), 0, b"mid", b"mid", b"")
        .unwrap());
    assert!(vault
        .propose_snapshot(Watermark::new(20, 2000), &b"second"[..])
        .unwrap());

    let txn = vault.store().read_only().unwrap();
    let snapshots = txn.snapshots().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].watermark, Watermark::new(20, 2000));
    assert!(txn.blocks().unwrap().is_empty());
}

#[test]
fn stale_snapshot_proposal_is_rejected() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_snapshot(Watermark::new(10, 1000), &b"current"[..])
        .unwrap());
    assert!(!vault
        .propose_snapshot(Watermark::new(10, 1000), &b"stale"[..])
        .unwrap());
    assert!(!vault
        .propose_snapshot(Watermark::new(9, 2000), &b"stale"[..])
        .unwrap());

    let events = sync_events(&vault, b"");
    assert_eq!(events, vec![Event::Snapshot(b"current".to_vec())]);
}

#[test]
fn full_bootstrap_streams_snapshot_then_ordered_blocks() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(1, 10), 0, b"one", b"a", b"")
        .unwrap());
    assert!(vault
        .propose_constructed_block(Watermark::new(2, 20), 0, b"two", b"b", b"a")
        .unwrap());
    assert!(vault
        .propose_snapshot(Watermark::new(2, 20), &b"state@2"[..])
        .unwrap());
    assert!(vault
        .propose_constructed_block(Watermark::new(3, 30), 0, b"three", b"c", b"b")
        .unwrap());
    assert!(vault
        .propose_constructed_block(Watermark::new(4, 40), 0, b"four", b"d", b"c")
        .unwrap());

    let events = sync_events(&vault, b"");
    assert_eq!(
        events,
        vec![
            Event::Snapshot(b"state@2".to_vec()),
            Event::Block(b"three".to_vec()),
            Event::Block(b"four".to_vec()),
        ]
    );
}

#[test]
fn full_bootstrap_without_snapshot_streams_blocks_only() {
    let vault = BlockVault::new(MemoryStore::new());
    for (i, payload) in [b"one", b"two"].iter().enumerate() {
        let id = format!("id-{i}");
        assert!(vault
            .propose_constructed_block(
                Watermark::new(i as u32 + 1, (i as u32 + 1) * 10),
                0,
                *payload,
                id.as_bytes(),
                b"",
            )
            .unwrap());
    }

    let mut sink = RecordingSink::default();
    vault.sync(b"", &mut sink).unwrap();
    assert!(sink.snapshots().is_empty());
    assert_eq!(sink.blocks(), vec![b"one".to_vec(), b"two".to_vec()]);
}

#[test]
fn incremental_catch_up_streams_from_the_ancestor() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(1, 10), 0, b"one", b"a", b"")
        .unwrap());
    assert!(vault
        .propose_constructed_block(Watermark::new(2, 20), 0, b"two", b"b", b"a")
        .unwrap());
    assert!(vault
        .propose_constructed_block(Watermark::new(3, 30), 0, b"three", b"c", b"b")
        .unwrap());

    // Follower holds block "a": stream its successors, no snapshot.
    let events = sync_events(&vault, b"a");
    assert_eq!(
        events,
        vec![
            Event::Block(b"two".to_vec()),
            Event::Block(b"three".to_vec()),
        ]
    );
}

#[test]
fn caught_up_follower_gets_no_callbacks() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(1, 10), 0, b"one", b"a", b"")
        .unwrap());
    assert!(vault
        .propose_constructed_block(Watermark::new(2, 20), 0, b"two", b"b", b"a")
        .unwrap());

    // "b" is the head block: nothing lists it as ancestor, but it exists.
    assert!(sync_events(&vault, b"b").is_empty());
}

#[test]
fn unknown_ancestor_falls_back_to_bootstrap() {
    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(1, 10), 0, b"one", b"a", b"")
        .unwrap());

    let events = sync_events(&vault, b"never-seen");
    assert_eq!(events, vec![Event::Block(b"one".to_vec())]);
}

#[test]
fn payload_round_trips_byte_identical() {
    let vault = BlockVault::new(MemoryStore::new());
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    assert!(vault
        .propose_constructed_block(Watermark::new(1, 1), 0, &payload, b"big", b"")
        .unwrap());

    let mut sink = RecordingSink::default();
    vault.sync(b"", &mut sink).unwrap();
    assert_eq!(sink.blocks(), vec![payload]);
}

#[test]
fn snapshot_streams_in_chunks() {
    let vault = BlockVault::with_config(
        MemoryStore::new(),
        blockvault_core::VaultConfig::new().with_chunk_size(16),
    );
    let payload: Vec<u8> = (0..1000u32).map(|i| (i % 253) as u8).collect();
    assert!(vault
        .propose_snapshot(Watermark::new(1, 1), payload.as_slice())
        .unwrap());

    let mut sink = RecordingSink::default();
    vault.sync(b"", &mut sink).unwrap();
    assert_eq!(sink.snapshots(), vec![payload]);
}

#[test]
fn sink_errors_abort_the_sync() {
    struct FailingSink;
    impl SyncSink for FailingSink {
        fn on_block(&mut self, _payload: &[u8]) -> VaultResult<()> {
            Err(VaultError::sink("follower out of disk"))
        }
        fn on_snapshot(&mut self, _snapshot: &Path) -> VaultResult<()> {
            Ok(())
        }
    }

    let vault = BlockVault::new(MemoryStore::new());
    assert!(vault
        .propose_constructed_block(Watermark::new(1, 1), 0, b"one", b"a", b"")
        .unwrap());

    let err = vault.sync(b"", &mut FailingSink).unwrap_err();
    assert!(matches!(err, VaultError::Sink(_)));
}

// ---------------------------------------------------------------------------
// Error taxonomy: which store error classes each accept path swallows.
// ---------------------------------------------------------------------------

/// A store whose inserts always fail with a configurable error class.
struct FaultyStore {
    fail: fn() -> StoreError,
}

impl VaultStore for FaultyStore {
    fn serializable(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(FaultyTxn { fail: self.fail }))
    }

    fn read_only(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(FaultyTxn { fail: self.fail }))
    }
}

struct FaultyTxn {
    fail: fn() -> StoreError,
}

impl StoreTransaction for FaultyTxn {
    fn blocks(&self) -> StoreResult<Vec<BlockRow>> {
        Ok(Vec::new())
    }
    fn snapshots(&self) -> StoreResult<Vec<SnapshotRow>> {
        Ok(Vec::new())
    }
    fn has_block(&self, _block_id: &[u8]) -> StoreResult<bool> {
        Ok(false)
    }
    fn block_by_payload(&self, _payload: BlobId) -> StoreResult<Option<BlockRow>> {
        Ok(None)
    }
    fn snapshot_by_payload(&self, _payload: BlobId) -> StoreResult<Option<SnapshotRow>> {
        Ok(None)
    }
    fn insert_block_if(&mut self, _row: BlockRow, _guard: &InsertGuard) -> StoreResult<()> {
        Err((self.fail)())
    }
    fn insert_snapshot_if(
        &mut self,
        _row: SnapshotRow,
        _guard: &SnapshotGuard,
    ) -> StoreResult<()> {
        Err((self.fail)())
    }
    fn delete_block(&mut self, _block_id: &[u8]) -> StoreResult<()> {
        Ok(())
    }
    fn delete_snapshot(&mut self, _payload: BlobId) -> StoreResult<()> {
        Ok(())
    }
    fn create_blob(&mut self) -> StoreResult<BlobId> {
        Ok(BlobId::new(1))
    }
    fn append_blob(&mut self, _id: BlobId, _chunk: &[u8]) -> StoreResult<()> {
        Ok(())
    }
    fn read_blob(&self, _id: BlobId, _offset: u64, _len: usize) -> StoreResult<Vec<u8>> {
        Ok(Vec::new())
    }
    fn blob_size(&self, _id: BlobId) -> StoreResult<u64> {
        Ok(0)
    }
    fn unlink_blob(&mut self, _id: BlobId) -> StoreResult<()> {
        Ok(())
    }
    fn commit(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[test]
fn block_paths_swallow_serialization_and_constraint_errors() {
    for fail in [
        (|| StoreError::serialization("lost conflict")) as fn() -> StoreError,
        (|| StoreError::constraint("duplicate block id")) as fn() -> StoreError,
    ] {
        let vault = BlockVault::new(FaultyStore { fail });
        assert!(!vault
            .propose_constructed_block(Watermark::new(1, 1), 0, b"x", b"id", b"")
            .unwrap());
        assert!(!vault.append_external_block(1, 1, b"x", b"id", b"").unwrap());
    }
}

#[test]
fn block_paths_propagate_hard_errors() {
    let vault = BlockVault::new(FaultyStore {
        fail: || StoreError::corrupted("bad page"),
    });
    let err = vault
        .propose_constructed_block(Watermark::new(1, 1), 0, b"x", b"id", b"")
        .unwrap_err();
    assert!(matches!(err, VaultError::Store(StoreError::Corrupted(_))));
}

#[test]
fn snapshot_path_swallows_only_serialization_errors() {
    let vault = BlockVault::new(FaultyStore {
        fail: || StoreError::serialization("lost conflict"),
    });
    assert!(!vault
        .propose_snapshot(Watermark::new(1, 1), &b"state"[..])
        .unwrap());

    // A constraint violation propagates on this path.
    let vault = BlockVault::new(FaultyStore {
        fail: || StoreError::constraint("duplicate"),
    });
    let err = vault
        .propose_snapshot(Watermark::new(1, 1), &b"state"[..])
        .unwrap_err();
    assert!(matches!(err, VaultError::Store(StoreError::Constraint(_))));
}
