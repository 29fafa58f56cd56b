//! # BlockVault Core
//!
//! High-availability replication backend for a blockchain node.
//!
//! One or more independent candidate producers propose blocks and periodic
//! state snapshots into a shared durable store; followers resynchronize
//! from that store. [`BlockVault`] guarantees a single globally-ordered
//! history under active-active failover using only the store's
//! serializable transactions and watermark-guarded conditional inserts,
//! with no leader election and no liveness detection.
//!
//! This crate provides:
//! - The fencing/insert protocol
//!   ([`BlockVault::propose_constructed_block`],
//!   [`BlockVault::append_external_block`],
//!   [`BlockVault::propose_snapshot`])
//! - Retention/compaction of records superseded by an accepted snapshot
//! - The pull-based resync protocol ([`BlockVault::sync`])
//!
//! ## Key Invariants
//!
//! - At most one proposal at a given watermark is durably accepted;
//!   losers observe `Ok(false)` and must re-derive state, not retry blindly
//! - A visible snapshot implies its compaction completed (same transaction)
//! - Externally sourced blocks never advance the watermark
//! - Resync is read-only and pushes nothing unsolicited: it invokes the
//!   caller's sink at most once per snapshot and once per block

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod compaction;
mod config;
mod error;
mod sink;
mod vault;

pub use compaction::CompactionStats;
pub use config::{VaultConfig, DEFAULT_CHUNK_SIZE};
pub use error::{VaultError, VaultResult};
pub use sink::SyncSink;
pub use vault::BlockVault;

// Store types callers need to hold or construct.
pub use blockvault_store::{
    BlobId, FileStore, MemoryStore, StoreError, VaultStore, Watermark,
};
