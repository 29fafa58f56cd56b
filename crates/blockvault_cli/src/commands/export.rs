//! Export command implementation.
//!
//! Runs the resync protocol against a vault file and writes each payload
//! the protocol pushes into an output directory, the way a bootstrapping
//! follower would feed them into its local ledger.

use blockvault_core::{BlockVault, SyncSink, VaultError, VaultResult};
use blockvault_store::FileStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Sink that writes every payload into the output directory as
/// `snapshot.bin` and `block-<n>.bin`.
struct DirectorySink {
    out: PathBuf,
    blocks_written: usize,
    snapshot_written: bool,
}

impl SyncSink for DirectorySink {
    fn on_block(&mut self, payload: &[u8]) -> VaultResult<()> {
        let name = format!("block-{:06}.bin", self.blocks_written);
        fs::write(self.out.join(name), payload)?;
        self.blocks_written += 1;
        Ok(())
    }

    fn on_snapshot(&mut self, snapshot: &Path) -> VaultResult<()> {
        fs::copy(snapshot, self.out.join("snapshot.bin"))?;
        self.snapshot_written = true;
        Ok(())
    }
}

/// Runs the export command.
pub fn run(
    path: &Path,
    ancestor: Option<&str>,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let ancestor = match ancestor {
        Some(hex_id) if !hex_id.is_empty() => {
            hex::decode(hex_id).map_err(|e| VaultError::sink(format!("bad ancestor id: {e}")))?
        }
        _ => Vec::new(),
    };

    let vault = BlockVault::new(FileStore::open_existing(path)?);
    fs::create_dir_all(out)?;

    let mut sink = DirectorySink {
        out: out.to_path_buf(),
        blocks_written: 0,
        snapshot_written: false,
    };
    vault.sync(&ancestor, &mut sink)?;
    info!(
        vault = %path.display(),
        blocks = sink.blocks_written,
        snapshot = sink.snapshot_written,
        "export complete"
    );

    if sink.snapshot_written {
        println!("Wrote snapshot.bin");
    }
    println!("Wrote {} block payload(s) to {}", sink.blocks_written, out.display());

    Ok(())
}
