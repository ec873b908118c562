//! Resource handle trait definition.

use crate::error::StorageResult;
use crate::types::{ConnectionId, HandleId};
use std::path::Path;

/// A unit of work against a file-backed resource.
///
/// A managed connection owns at most one handle at a time and drives its
/// local transaction through `begin`, `commit` and `rollback`. Handles are
/// cheap to clone and every clone refers to the same session: the copy
/// given to application code and the copy kept by the connection observe
/// the same transaction.
///
/// # Invariants
///
/// - A handle is bound to one root directory for its whole lifetime
/// - `destroy` is irrevocable; later calls on any clone fail
/// - Errors are reported as-is; callers decide whether the handle is still usable
///
/// # Implementors
///
/// - [`super::FileBucket`] - Transactional blob store over a directory
pub trait ResourceHandle: Clone + Send + Sync + 'static {
    /// Opens a new session rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be prepared.
    fn open(root: &Path) -> StorageResult<Self>;

    /// Returns the identifier shared by all clones of this handle.
    fn id(&self) -> HandleId;

    /// Returns the connection currently owning this handle, if any.
    fn owner(&self) -> Option<ConnectionId>;

    /// Records `owner` as the connection that owns this handle.
    ///
    /// Called on creation and whenever the handle is associated with a
    /// different connection.
    fn set_owner(&self, owner: ConnectionId);

    /// Starts a local transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already open or the handle is closed.
    fn begin(&self) -> StorageResult<()>;

    /// Commits the open local transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open, the handle is closed,
    /// or the underlying storage fails.
    fn commit(&self) -> StorageResult<()>;

    /// Discards the open local transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open or the handle is closed.
    fn rollback(&self) -> StorageResult<()>;

    /// Terminates the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was already destroyed.
    fn destroy(&self) -> StorageResult<()>;
}
