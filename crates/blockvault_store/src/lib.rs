//! # BlockVault Store
//!
//! Transactional store adapter for BlockVault.
//!
//! This crate provides the lowest-level abstraction of the vault: a store
//! that holds two tables (block records and snapshot records) plus a
//! large-object space for their payloads, accessed through serializable
//! transactions.
//!
//! ## Design Principles
//!
//! - All mutation happens inside a [`StoreTransaction`]; dropping a
//!   transaction without committing rolls it back
//! - Guarded inserts ([`StoreTransaction::insert_block_if`],
//!   [`StoreTransaction::insert_snapshot_if`]) evaluate their condition
//!   atomically with the insert and insert **zero rows silently** when the
//!   guard fails; acceptance is detected by a follow-up point read
//! - Payloads live in the large-object space, streamed in chunks, never as
//!   inline row values
//! - Stores must be `Send + Sync`; transactions are single-threaded
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral vaults
//! - [`FileStore`] - Persistent single-file vault with a cross-process
//!   advisory lock
//!
//! ## Example
//!
//! ```rust
//! use blockvault_store::{MemoryStore, StoreTransaction, VaultStore};
//!
//! let store = MemoryStore::new();
//! let mut txn = store.serializable().unwrap();
//! let blob = txn.create_blob().unwrap();
//! txn.append_blob(blob, b"payload bytes").unwrap();
//! assert_eq!(txn.blob_size(blob).unwrap(), 13);
//! txn.commit().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod error;
mod file;
mod memory;
mod tables;
mod types;

pub use adapter::{StoreTransaction, VaultStore};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use types::{BlobId, BlockRow, InsertGuard, SnapshotGuard, SnapshotRow, Watermark};
