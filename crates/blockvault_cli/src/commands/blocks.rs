//! Blocks listing command implementation.

use blockvault_store::{FileStore, StoreTransaction, VaultStore};
use std::path::Path;

/// Runs the blocks command.
pub fn run(path: &Path, limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open_existing(path)?;
    let txn = store.read_only()?;

    let mut rows = txn.blocks()?;
    rows.sort_by_key(|b| b.block_num);
    let shown = limit.unwrap_or(rows.len()).min(rows.len());

    println!(
        "{:>10}  {:>14}  {:>8}  {:<16}  {:<16}  {:>10}",
        "num", "watermark", "lib", "id", "prev", "bytes"
    );
    for row in rows.iter().take(shown) {
        println!(
            "{:>10}  {:>14}  {:>8}  {:<16}  {:<16}  {:>10}",
            row.block_num,
            row.watermark.to_string(),
            row.lib,
            short_hex(row.block_id.as_ref()),
            short_hex(row.previous_block_id.as_ref()),
            row.payload_size,
        );
    }
    if shown < rows.len() {
        println!("... {} more", rows.len() - shown);
    }

    Ok(())
}

/// Hex prefix of an opaque id, for display.
fn short_hex(id: &[u8]) -> String {
    let prefix = &id[..id.len().min(8)];
    if id.len() > 8 {
        format!("{}..", hex::encode(prefix))
    } else {
        hex::encode(prefix)
    }
}
