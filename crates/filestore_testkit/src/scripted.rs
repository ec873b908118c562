//! A scripted resource handle.
//!
//! [`ScriptedHandle`] counts every call the connector makes and can be told
//! to fail specific operations, which a real bucket cannot be made to do on
//! demand.

use filestore_storage::{ConnectionId, HandleId, ResourceHandle, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle operation a test can count or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleOp {
    /// `ResourceHandle::begin`
    Begin,
    /// `ResourceHandle::commit`
    Commit,
    /// `ResourceHandle::rollback`
    Rollback,
    /// `ResourceHandle::destroy`
    Destroy,
}

/// Number of times each operation was invoked, failed attempts included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Calls to `begin`.
    pub begin: usize,
    /// Calls to `commit`.
    pub commit: usize,
    /// Calls to `rollback`.
    pub rollback: usize,
    /// Calls to `destroy`.
    pub destroy: usize,
}

/// Resource handle double with call counting and failure injection.
///
/// Clones share counters and failure settings, so a test can keep the
/// copy returned by `get_connection` and inspect what the connection did.
#[derive(Debug, Clone)]
pub struct ScriptedHandle {
    inner: Arc<ScriptedInner>,
}

#[derive(Debug)]
struct ScriptedInner {
    id: HandleId,
    root: PathBuf,
    owner: Mutex<Option<ConnectionId>>,
    calls: Mutex<CallCounts>,
    failing: Mutex<HashSet<HandleOp>>,
}

impl ScriptedHandle {
    /// Makes every later call of `op` fail with an I/O error.
    pub fn fail(&self, op: HandleOp) {
        self.inner.failing.lock().insert(op);
    }

    /// Lets `op` succeed again.
    pub fn recover(&self, op: HandleOp) {
        self.inner.failing.lock().remove(&op);
    }

    /// Returns the call counts so far.
    pub fn calls(&self) -> CallCounts {
        *self.inner.calls.lock()
    }

    /// Returns the root the handle was opened at.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn invoke(&self, op: HandleOp) -> StorageResult<()> {
        {
            let mut calls = self.inner.calls.lock();
            match op {
                HandleOp::Begin => calls.begin += 1,
                HandleOp::Commit => calls.commit += 1,
                HandleOp::Rollback => calls.rollback += 1,
                HandleOp::Destroy => calls.destroy += 1,
            }
        }

        if self.inner.failing.lock().contains(&op) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("scripted {op:?} failure"),
            )));
        }
        Ok(())
    }
}

impl ResourceHandle for ScriptedHandle {
    fn open(root: &Path) -> StorageResult<Self> {
        Ok(Self {
            inner: Arc::new(ScriptedInner {
                id: HandleId::new(),
                root: root.to_path_buf(),
                owner: Mutex::new(None),
                calls: Mutex::new(CallCounts::default()),
                failing: Mutex::new(HashSet::new()),
            }),
        })
    }

    fn id(&self) -> HandleId {
        self.inner.id
    }

    fn owner(&self) -> Option<ConnectionId> {
        *self.inner.owner.lock()
    }

    fn set_owner(&self, owner: ConnectionId) {
        *self.inner.owner.lock() = Some(owner);
    }

    fn begin(&self) -> StorageResult<()> {
        self.invoke(HandleOp::Begin)
    }

    fn commit(&self) -> StorageResult<()> {
        self.invoke(HandleOp::Commit)
    }

    fn rollback(&self) -> StorageResult<()> {
        self.invoke(HandleOp::Rollback)
    }

    fn destroy(&self) -> StorageResult<()> {
        self.invoke(HandleOp::Destroy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_calls_across_clones() {
        let handle = ScriptedHandle::open(Path::new("unused")).unwrap();
        let copy = handle.clone();

        handle.begin().unwrap();
        copy.commit().unwrap();

        assert_eq!(
            handle.calls(),
            CallCounts {
                begin: 1,
                commit: 1,
                ..CallCounts::default()
            }
        );
    }

    #[test]
    fn fail_and_recover() {
        let handle = ScriptedHandle::open(Path::new("unused")).unwrap();

        handle.fail(HandleOp::Rollback);
        assert!(matches!(handle.rollback(), Err(StorageError::Io(_))));

        handle.recover(HandleOp::Rollback);
        assert!(handle.rollback().is_ok());
        assert_eq!(handle.calls().rollback, 2);
    }
}
