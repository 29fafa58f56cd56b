//! Status command implementation.

use blockvault_store::{FileStore, StoreTransaction, VaultStore, Watermark};
use serde::Serialize;
use std::path::Path;

/// Vault status summary.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Vault file path.
    pub path: String,
    /// Derived watermark, block axis.
    pub watermark_block: u32,
    /// Derived watermark, timestamp axis.
    pub watermark_timestamp: u32,
    /// Highest recorded LIB.
    pub lib: u32,
    /// Number of stored block records.
    pub block_count: usize,
    /// Number of stored snapshot records.
    pub snapshot_count: usize,
    /// Total block payload bytes.
    pub payload_bytes: u64,
}

/// Runs the status command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open_existing(path)?;
    let txn = store.read_only()?;

    let blocks = txn.blocks()?;
    let snapshots = txn.snapshots()?;

    let watermark = blocks
        .iter()
        .fold(Watermark::ZERO, |acc, b| acc.max_axes(b.watermark));
    let result = StatusResult {
        path: path.display().to_string(),
        watermark_block: watermark.block,
        watermark_timestamp: watermark.timestamp,
        lib: blocks.iter().map(|b| b.lib).max().unwrap_or(0),
        block_count: blocks.len(),
        snapshot_count: snapshots.len(),
        payload_bytes: blocks.iter().map(|b| b.payload_size).sum(),
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Vault: {}", result.path);
        println!(
            "Watermark: ({}, {})",
            result.watermark_block, result.watermark_timestamp
        );
        println!("LIB: {}", result.lib);
        println!("Blocks: {}", result.block_count);
        println!("Snapshots: {}", result.snapshot_count);
        println!("Payload bytes: {}", result.payload_bytes);
    }

    Ok(())
}
