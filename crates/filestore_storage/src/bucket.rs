//! File-backed resource handle.
//!
//! A bucket is a flat directory of named blobs:
//!
//! ```text
//! <root>/
//! ├─ invoice-17.pdf     # committed blob
//! ├─ notes.txt          # committed blob
//! └─ .notes.txt.<handle>.pending # commit in flight (renamed over notes.txt)
//! ```
//!
//! Names starting with `.` are reserved for in-flight files and never
//! listed.

use crate::error::{StorageError, StorageResult};
use crate::handle::ResourceHandle;
use crate::staging::{PendingWrite, StagedTransaction};
use crate::types::{ConnectionId, HandleId};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Suffix of the temporary file a blob is written to before the rename.
const PENDING_SUFFIX: &str = ".pending";

/// A transactional blob store rooted at one directory.
///
/// Outside a local transaction every `write` and `delete` is applied to
/// disk immediately. Between `begin` and `commit` changes are staged in
/// memory: reads see them, other handles on the same directory do not.
/// `rollback` drops the staged changes.
///
/// # Durability
///
/// Each blob is written to a temporary file, synced, and renamed into
/// place, so a crash never leaves a half-written blob under its final name.
/// A commit is applied blob by blob; it is not atomic across blobs.
///
/// # Thread Safety
///
/// Clones share one session guarded by an internal lock, so the copy held
/// by a managed connection and the copy held by the application always
/// agree on the transaction state.
///
/// # Example
///
/// ```no_run
/// use filestore_storage::{FileBucket, ResourceHandle};
/// use std::path::Path;
///
/// let bucket = FileBucket::open(Path::new("data")).unwrap();
/// bucket.begin().unwrap();
/// bucket.write("greeting.txt", b"hello").unwrap();
/// bucket.commit().unwrap();
/// assert_eq!(bucket.fetch("greeting.txt").unwrap(), Some(b"hello".to_vec()));
/// ```
#[derive(Debug, Clone)]
pub struct FileBucket {
    inner: Arc<BucketInner>,
}

#[derive(Debug)]
struct BucketInner {
    id: HandleId,
    root: PathBuf,
    session: Mutex<Session>,
}

#[derive(Debug, Default)]
struct Session {
    owner: Option<ConnectionId>,
    transaction: Option<StagedTransaction>,
    closed: bool,
}

impl Session {
    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

impl FileBucket {
    /// Returns the root directory of this bucket.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Returns true while a local transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.inner.session.lock().transaction.is_some()
    }

    /// Returns true once the bucket has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.session.lock().closed
    }

    /// Creates or replaces the blob `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, the bucket is closed, or
    /// (outside a transaction) the write fails.
    pub fn write(&self, name: &str, payload: &[u8]) -> StorageResult<()> {
        validate_name(name)?;
        let mut session = self.inner.session.lock();
        session.ensure_open()?;

        match session.transaction.as_mut() {
            Some(txn) => {
                txn.put(name, payload.to_vec());
                Ok(())
            }
            None => self.write_blob(name, payload),
        }
    }

    /// Reads the blob `name`, returning `None` if it does not exist.
    ///
    /// Inside a transaction, staged changes are visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, the bucket is closed, or
    /// the read fails.
    pub fn fetch(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_name(name)?;
        let session = self.inner.session.lock();
        session.ensure_open()?;

        if let Some(staged) = session.transaction.as_ref().and_then(|txn| txn.get(name)) {
            return Ok(match staged {
                PendingWrite::Put { payload } => Some(payload.clone()),
                PendingWrite::Delete => None,
            });
        }

        match fs::read(self.blob_path(name)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the blob `name`. Removing a missing blob is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, the bucket is closed, or
    /// (outside a transaction) the removal fails.
    pub fn delete(&self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        let mut session = self.inner.session.lock();
        session.ensure_open()?;

        match session.transaction.as_mut() {
            Some(txn) => {
                txn.delete(name);
                Ok(())
            }
            None => self.remove_blob(name),
        }
    }

    /// Returns true if the blob `name` exists in this session's view.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the bucket is closed.
    pub fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.fetch(name)?.is_some())
    }

    /// Lists blob names in this session's view, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket is closed or the directory cannot be read.
    pub fn list(&self) -> StorageResult<Vec<String>> {
        let session = self.inner.session.lock();
        session.ensure_open()?;

        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.inner.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.insert(name.to_owned());
                }
            }
        }

        if let Some(txn) = session.transaction.as_ref() {
            for (name, write) in txn.pending_writes() {
                match write {
                    PendingWrite::Put { .. } => {
                        names.insert(name.clone());
                    }
                    PendingWrite::Delete => {
                        names.remove(name);
                    }
                }
            }
        }

        Ok(names.into_iter().collect())
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.inner.root.join(name)
    }

    /// Temporary path for `name`, unique per handle so buckets sharing a
    /// root never write to the same in-flight file.
    fn temp_path(&self, name: &str) -> PathBuf {
        self.inner.root.join(format!(
            ".{name}.{}{PENDING_SUFFIX}",
            self.inner.id.as_uuid().simple()
        ))
    }

    /// Writes a blob using the write-then-rename pattern.
    fn write_blob(&self, name: &str, payload: &[u8]) -> StorageResult<()> {
        let temp_path = self.temp_path(name);

        let mut file = File::create(&temp_path)?;
        file.write_all(payload)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.blob_path(name))?;
        self.sync_directory()
    }

    fn remove_blob(&self, name: &str) -> StorageResult<()> {
        match fs::remove_file(self.blob_path(name)) {
            Ok(()) => self.sync_directory(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.inner.root)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl ResourceHandle for FileBucket {
    /// Opens a bucket at `root`, creating the directory if needed.
    fn open(root: &Path) -> StorageResult<Self> {
        if root.exists() && !root.is_dir() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bucket root is not a directory: {}", root.display()),
            )));
        }
        fs::create_dir_all(root)?;

        let id = HandleId::new();
        debug!(handle = %id, root = %root.display(), "opened file bucket");

        Ok(Self {
            inner: Arc::new(BucketInner {
                id,
                root: root.to_path_buf(),
                session: Mutex::new(Session::default()),
            }),
        })
    }

    fn id(&self) -> HandleId {
        self.inner.id
    }

    fn owner(&self) -> Option<ConnectionId> {
        self.inner.session.lock().owner
    }

    fn set_owner(&self, owner: ConnectionId) {
        self.inner.session.lock().owner = Some(owner);
    }

    fn begin(&self) -> StorageResult<()> {
        let mut session = self.inner.session.lock();
        session.ensure_open()?;
        if session.transaction.is_some() {
            return Err(StorageError::TransactionActive);
        }
        session.transaction = Some(StagedTransaction::new());
        debug!(handle = %self.inner.id, "local transaction started");
        Ok(())
    }

    fn commit(&self) -> StorageResult<()> {
        let mut session = self.inner.session.lock();
        session.ensure_open()?;
        let txn = session
            .transaction
            .as_ref()
            .ok_or(StorageError::NoTransaction)?;

        // Puts first so a failed commit never loses data it was replacing.
        for (name, write) in txn.pending_writes() {
            if let PendingWrite::Put { payload } = write {
                self.write_blob(name, payload)?;
            }
        }
        for (name, write) in txn.pending_writes() {
            if matches!(write, PendingWrite::Delete) {
                self.remove_blob(name)?;
            }
        }

        let applied = txn.write_count();
        session.transaction = None;
        debug!(handle = %self.inner.id, applied, "local transaction committed");
        Ok(())
    }

    fn rollback(&self) -> StorageResult<()> {
        let mut session = self.inner.session.lock();
        session.ensure_open()?;
        let txn = session
            .transaction
            .take()
            .ok_or(StorageError::NoTransaction)?;
        debug!(
            handle = %self.inner.id,
            discarded = txn.write_count(),
            "local transaction rolled back"
        );
        Ok(())
    }

    fn destroy(&self) -> StorageResult<()> {
        let mut session = self.inner.session.lock();
        session.ensure_open()?;
        session.transaction = None;
        session.closed = true;
        debug!(handle = %self.inner.id, "file bucket destroyed");
        Ok(())
    }
}

/// Checks that `name` is a single plain file name.
fn validate_name(name: &str) -> StorageResult<()> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();

    if !single_normal || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidName(name.to_owned()));
    }
    Ok(())
}
