//! Transaction demarcation contracts.

use crate::error::ConnectorResult;

/// Begin/commit/rollback for a transaction scoped to a single resource.
///
/// Implemented by [`crate::ManagedConnection`]; obtain it through
/// [`crate::ManagedConnection::local_transaction`].
pub trait LocalTransaction {
    /// Starts a local transaction.
    ///
    /// # Errors
    ///
    /// Fails if no handle is assigned, the handle fails, or a listener fails.
    fn begin(&mut self) -> ConnectorResult<()>;

    /// Commits the local transaction.
    ///
    /// # Errors
    ///
    /// Fails if no handle is assigned, the handle fails, or a listener fails.
    fn commit(&mut self) -> ConnectorResult<()>;

    /// Rolls back the local transaction.
    ///
    /// # Errors
    ///
    /// Fails if no handle is assigned, the handle fails, or a listener fails.
    fn rollback(&mut self) -> ConnectorResult<()>;
}

/// A distributed-transaction resource.
///
/// Two-phase coordination is not supported, so this type has no values and
/// [`crate::ManagedConnection::xa_resource`] can only return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XaResource {}
