//! File-based store for persistent vaults.

use crate::adapter::{StoreTransaction, VaultStore};
use crate::error::{StoreError, StoreResult};
use crate::tables::VaultTables;
use crate::types::{BlobId, BlockRow, InsertGuard, SnapshotGuard, SnapshotRow};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A persistent vault store backed by a single CBOR-encoded file.
///
/// Isolation comes from an advisory lock on a sidecar `<path>.lock` file:
/// a serializable transaction holds it exclusively for its whole lifetime,
/// a read-only transaction holds it shared. Independent processes on the
/// same host therefore exclude each other without any shared memory.
/// Writers block on the lock rather than abort, so this store never emits
/// [`StoreError::Serialization`] itself.
///
/// Commits are atomic: the new state is written to a temporary sibling
/// file, synced, and renamed over the vault file. A transaction dropped
/// without commit leaves the file untouched. The sidecar is locked rather
/// than the vault file itself because the vault file's inode changes on
/// every commit.
///
/// # Example
///
/// ```no_run
/// use blockvault_store::{FileStore, StoreTransaction, VaultStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("node.vault")).unwrap();
/// let txn = store.read_only().unwrap();
/// println!("{} blocks", txn.blocks().unwrap().len());
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Opens a vault file, creating it empty if absent.
    ///
    /// Bootstrap is idempotent and race-tolerant: initialization happens
    /// under the exclusive sidecar lock, so two processes opening the same
    /// missing vault concurrently end up with exactly one initializer.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be created or locked.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let store = Self {
            path: path.to_path_buf(),
            lock_path: sidecar_path(path),
        };

        let lock = store.open_lock_file()?;
        lock.lock_exclusive()?;
        if !store.path.exists() {
            write_state(&store.path, &VaultTables::new())?;
        }
        lock.unlock()?;

        Ok(store)
    }

    /// Opens an existing vault file, failing if it is absent.
    ///
    /// For read-only inspection tools that must never create state.
    ///
    /// # Errors
    ///
    /// Returns a not-found I/O error if the vault file does not exist.
    pub fn open_existing(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("vault file {} does not exist", path.display()),
            )));
        }
        Self::open(path)
    }

    /// Opens a vault file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the vault
    /// cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path of the vault file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock_file(&self) -> StoreResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?)
    }

    fn begin(&self, writable: bool) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        let lock = self.open_lock_file()?;
        if writable {
            lock.lock_exclusive()?;
        } else {
            lock.lock_shared()?;
        }

        let tables = read_state(&self.path)?;
        Ok(Box::new(FileTxn {
            tables,
            path: self.path.clone(),
            _lock: lock,
            writable,
        }))
    }
}

impl VaultStore for FileStore {
    fn serializable(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        self.begin(true)
    }

    fn read_only(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        self.begin(false)
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

fn read_state(path: &Path) -> StoreResult<VaultTables> {
    let file = File::open(path)?;
    ciborium::from_reader(BufReader::new(file)).map_err(|e| match e {
        ciborium::de::Error::Io(io) => StoreError::Io(io),
        other => StoreError::corrupted(other.to_string()),
    })
}

fn write_state(path: &Path, tables: &VaultTables) -> StoreResult<()> {
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut writer = BufWriter::new(File::create(&tmp)?);
    ciborium::into_writer(tables, &mut writer).map_err(|e| match e {
        ciborium::ser::Error::Io(io) => StoreError::Io(io),
        other => StoreError::corrupted(other.to_string()),
    })?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    fs::rename(&tmp, path)?;

    // The rename itself must reach disk before the commit is durable.
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

struct FileTxn {
    tables: VaultTables,
    path: PathBuf,
    /// Held for the transaction's lifetime; released on drop.
    _lock: File,
    writable: bool,
}

impl FileTxn {
    fn writable(&mut self) -> StoreResult<&mut VaultTables> {
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        Ok(&mut self.tables)
    }
}

impl StoreTransaction for FileTxn {
    fn blocks(&self) -> StoreResult<Vec<BlockRow>> {
        Ok(self.tables.blocks())
    }

    fn snapshots(&self) -> StoreResult<Vec<SnapshotRow>> {
        Ok(self.tables.snapshots())
    }

    fn has_block(&self, block_id: &[u8]) -> StoreResult<bool> {
        Ok(self.tables.has_block(block_id))
    }

    fn block_by_payload(&self, payload: BlobId) -> StoreResult<Option<BlockRow>> {
        Ok(self.tables.block_by_payload(payload))
    }

    fn snapshot_by_payload(&self, payload: BlobId) -> StoreResult<Option<SnapshotRow>> {
        Ok(self.tables.snapshot_by_payload(payload))
    }

    fn insert_block_if(&mut self, row: BlockRow, guard: &InsertGuard) -> StoreResult<()> {
        self.writable()?.insert_block_if(row, guard)
    }

    fn insert_snapshot_if(&mut self, row: SnapshotRow, guard: &SnapshotGuard) -> StoreResult<()> {
        self.writable()?.insert_snapshot_if(row, guard)
    }

    fn delete_block(&mut self, block_id: &[u8]) -> StoreResult<()> {
        self.writable()?.delete_block(block_id);
        Ok(())
    }

    fn delete_snapshot(&mut self, payload: BlobId) -> StoreResult<()> {
        self.writable()?.delete_snapshot(payload);
        Ok(())
    }

    fn create_blob(&mut self) -> StoreResult<BlobId> {
        Ok(self.writable()?.create_blob())
    }

    fn append_blob(&mut self, id: BlobId, chunk: &[u8]) -> StoreResult<()> {
        self.writable()?.append_blob(id, chunk)
    }

    fn read_blob(&self, id: BlobId, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        self.tables.read_blob(id, offset, len)
    }

    fn blob_size(&self, id: BlobId) -> StoreResult<u64> {
        self.tables.blob_size(id)
    }

    fn unlink_blob(&mut self, id: BlobId) -> StoreResult<()> {
        self.writable()?.unlink_blob(id)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.writable {
            write_state(&self.path, &self.tables)?;
        }
        Ok(())
    }
}
