//! Managed connection state machine.

use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::event::{ConnectionEvent, ConnectionEventKind, ConnectionEventListener};
use crate::log_writer::LogWriter;
use crate::metadata::ConnectionMetaData;
use crate::request_info::{ConnectionRequestInfo, Credentials};
use crate::transaction::{LocalTransaction, XaResource};
use filestore_storage::{ConnectionId, FileBucket, ResourceHandle};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Lifecycle state of a managed connection.
///
/// ```text
/// Unassigned ── get_connection / associate ──▶ Active ──┐
///     ▲                                          │      │ associate
///     └────────────────── cleanup ───────────────┘ ◀────┘ (replace)
///
/// Active ── handle associated elsewhere ──▶ Unassigned
/// Unassigned | Active ── destroy ──▶ Destroyed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No handle is owned; transaction calls fail with `NoHandleAssigned`.
    Unassigned,
    /// Exactly one handle is owned.
    Active,
    /// The connection was destroyed and can no longer be used.
    Destroyed,
}

/// Owned handle, stored inside the state so "at most one handle" holds
/// by construction.
#[derive(Debug)]
enum Slot<H> {
    Unassigned,
    Active(H),
    Destroyed,
}

/// A pooled, reusable wrapper around one resource handle.
///
/// A pool creates managed connections through
/// [`crate::ManagedConnectionFactory`], hands out handles with
/// [`get_connection`](Self::get_connection), and drives local transactions
/// through [`LocalTransaction`]. Every transaction transition and every
/// close is broadcast to the registered listeners.
///
/// Two managed connections are equal when their request info is equal,
/// which is how the pool decides whether an idle connection can serve a
/// new request.
///
/// # Exclusive use
///
/// All lifecycle operations take `&mut self`. The pool must hand a
/// connection to one unit of work at a time; no internal locking is done.
///
/// # Example
///
/// ```rust
/// use filestore_connector::{ConnectorConfig, LocalTransaction, ManagedConnectionFactory};
///
/// let dir = tempfile::tempdir().unwrap();
/// let factory = ManagedConnectionFactory::new(ConnectorConfig::new().root_directory(dir.path()));
///
/// let mut mc = factory.create_managed_connection(None);
/// let bucket = mc.get_connection(None, None).unwrap();
///
/// mc.begin().unwrap();
/// bucket.write("a.txt", b"hello").unwrap();
/// mc.commit().unwrap();
/// mc.close().unwrap();
/// ```
pub struct ManagedConnection<H: ResourceHandle = FileBucket> {
    id: ConnectionId,
    root_directory: PathBuf,
    request_info: Option<ConnectionRequestInfo>,
    slot: Slot<H>,
    listeners: Vec<Arc<dyn ConnectionEventListener<H>>>,
    log_writer: Option<LogWriter>,
}

impl<H: ResourceHandle> ManagedConnection<H> {
    /// Creates a connection with no handle and no listeners.
    pub fn new(config: &ConnectorConfig, request_info: Option<ConnectionRequestInfo>) -> Self {
        let connection = Self {
            id: ConnectionId::new(),
            root_directory: config.root_directory.clone(),
            request_info,
            slot: Slot::Unassigned,
            listeners: Vec::new(),
            log_writer: None,
        };
        debug!(
            connection = %connection.id,
            root = %connection.root_directory.display(),
            "managed connection created"
        );
        connection
    }

    /// Sets the diagnostic sink for this connection.
    #[must_use]
    pub fn with_log_writer(mut self, log_writer: LogWriter) -> Self {
        log_writer.println("#ManagedConnection");
        self.log_writer = Some(log_writer);
        self
    }

    /// Returns this connection's identifier.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current lifecycle state.
    ///
    /// A connection whose handle was associated with another connection
    /// reports [`ConnectionState::Unassigned`].
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match self.slot {
            Slot::Destroyed => ConnectionState::Destroyed,
            _ if self.handle().is_some() => ConnectionState::Active,
            _ => ConnectionState::Unassigned,
        }
    }

    /// Returns the root directory handles are opened at.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Returns the request info this connection was created with.
    #[must_use]
    pub fn request_info(&self) -> Option<&ConnectionRequestInfo> {
        self.request_info.as_ref()
    }

    /// Returns the owned handle, if any.
    #[must_use]
    pub fn handle(&self) -> Option<&H> {
        match &self.slot {
            Slot::Active(handle) if handle.owner() == Some(self.id) => Some(handle),
            Slot::Active(_) | Slot::Unassigned | Slot::Destroyed => None,
        }
    }

    /// Returns the number of registered listeners, counting duplicates.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Returns the diagnostic sink, if one was configured.
    #[must_use]
    pub fn log_writer(&self) -> Option<&LogWriter> {
        self.log_writer.as_ref()
    }

    /// Opens a fresh handle at the root directory and makes it the owned one.
    ///
    /// Returns a clone of the handle for application code; the connection
    /// keeps its own clone to drive transactions and attach to events.
    ///
    /// # Errors
    ///
    /// - `HandleAlreadyAssigned` if a handle is already owned; the owned
    ///   handle is left untouched. Call [`cleanup`](Self::cleanup) first.
    /// - `ConnectionDestroyed` after [`destroy`](Self::destroy).
    /// - `Resource` if the handle cannot be opened.
    pub fn get_connection(
        &mut self,
        credentials: Option<&Credentials>,
        request_info: Option<&ConnectionRequestInfo>,
    ) -> ConnectorResult<H> {
        self.trace("getConnection");
        self.release_transferred();
        match self.slot {
            Slot::Unassigned => {}
            Slot::Active(_) => return Err(ConnectorError::HandleAlreadyAssigned),
            Slot::Destroyed => return Err(ConnectorError::ConnectionDestroyed),
        }

        let handle = H::open(&self.root_directory)?;
        handle.set_owner(self.id);
        debug!(
            connection = %self.id,
            handle = %handle.id(),
            user = credentials.map(Credentials::user_name),
            request_info = ?request_info,
            "handle assigned"
        );

        self.slot = Slot::Active(handle.clone());
        Ok(handle)
    }

    /// Takes ownership of a handle created by another managed connection.
    ///
    /// Any currently owned handle is replaced without being destroyed. The
    /// previous owner loses the handle: it reports `Unassigned` and its
    /// next call treats the handle as released.
    ///
    /// # Errors
    ///
    /// - `TypeMismatch` if `handle` is not an `H`.
    /// - `ConnectionDestroyed` after [`destroy`](Self::destroy).
    pub fn associate_connection(&mut self, handle: Box<dyn Any + Send>) -> ConnectorResult<()> {
        let handle = handle
            .downcast::<H>()
            .map_err(|_| ConnectorError::type_mismatch::<H>())?;
        self.associate_handle(*handle)
    }

    /// Typed form of [`associate_connection`](Self::associate_connection).
    ///
    /// # Errors
    ///
    /// Returns `ConnectionDestroyed` after [`destroy`](Self::destroy).
    pub fn associate_handle(&mut self, handle: H) -> ConnectorResult<()> {
        self.trace_with("associateConnection", handle.id());
        if matches!(self.slot, Slot::Destroyed) {
            return Err(ConnectorError::ConnectionDestroyed);
        }

        handle.set_owner(self.id);
        let incoming = handle.id();
        let previous = std::mem::replace(&mut self.slot, Slot::Active(handle));
        if let Slot::Active(previous) = previous {
            debug!(
                connection = %self.id,
                replaced = %previous.id(),
                handle = %incoming,
                "handle replaced by association"
            );
        } else {
            debug!(connection = %self.id, handle = %incoming, "handle associated");
        }
        Ok(())
    }

    /// Registers a listener. The same listener may be registered more than
    /// once and then receives every event once per registration.
    pub fn add_connection_event_listener(
        &mut self,
        listener: Arc<dyn ConnectionEventListener<H>>,
    ) {
        self.trace("addConnectionEventListener");
        self.listeners.push(listener);
    }

    /// Removes one registration of `listener`, matched by pointer identity.
    ///
    /// Returns false if the listener was not registered.
    pub fn remove_connection_event_listener<L>(&mut self, listener: &Arc<L>) -> bool
    where
        L: ConnectionEventListener<H> + ?Sized,
    {
        self.trace("removeConnectionEventListener");
        let target = Arc::as_ptr(listener).cast::<()>();
        match self
            .listeners
            .iter()
            .position(|registered| Arc::as_ptr(registered).cast::<()>() == target)
        {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Announces that the application closed its handle.
    ///
    /// The handle is not destroyed; the pool decides what happens next.
    ///
    /// # Errors
    ///
    /// - `NoHandleAssigned` if no handle is owned.
    /// - `ConnectionDestroyed` after [`destroy`](Self::destroy).
    /// - `Listener` if a listener fails.
    pub fn close(&mut self) -> ConnectorResult<()> {
        self.trace("close");
        self.release_transferred();
        self.fire(ConnectionEventKind::Closed)
    }

    /// Resets per-use state so the pool can hand this connection out again.
    ///
    /// The owned handle is released but not destroyed, and the connection
    /// returns to [`ConnectionState::Unassigned`]. Listeners stay registered.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionDestroyed` after [`destroy`](Self::destroy).
    pub fn cleanup(&mut self) -> ConnectorResult<()> {
        self.trace("cleanup");
        self.release_transferred();
        match std::mem::replace(&mut self.slot, Slot::Unassigned) {
            Slot::Active(handle) => {
                debug!(connection = %self.id, handle = %handle.id(), "handle released");
                Ok(())
            }
            Slot::Unassigned => Ok(()),
            Slot::Destroyed => {
                self.slot = Slot::Destroyed;
                Err(ConnectorError::ConnectionDestroyed)
            }
        }
    }

    /// Destroys the owned handle and retires this connection.
    ///
    /// No event is fired. If the handle fails to destroy, the error is
    /// returned and the connection keeps the handle. A handle that was
    /// associated with another connection is left alone.
    ///
    /// # Errors
    ///
    /// - `Resource` if the handle's `destroy` fails.
    /// - `ConnectionDestroyed` if already destroyed.
    pub fn destroy(&mut self) -> ConnectorResult<()> {
        self.trace("destroy");
        self.release_transferred();
        match &self.slot {
            Slot::Active(handle) => handle.destroy()?,
            Slot::Unassigned => {}
            Slot::Destroyed => return Err(ConnectorError::ConnectionDestroyed),
        }
        self.slot = Slot::Destroyed;
        debug!(connection = %self.id, "managed connection destroyed");
        Ok(())
    }

    /// Distributed transactions are not supported; always `None`.
    pub fn xa_resource(&self) -> Option<XaResource> {
        self.trace("getXAResource");
        None
    }

    /// Returns the local transaction contract, implemented by this connection.
    pub fn local_transaction(&mut self) -> &mut dyn LocalTransaction {
        self.trace("getLocalTransaction");
        self
    }

    /// Returns the fixed metadata of this connector.
    #[must_use]
    pub fn metadata(&self) -> ConnectionMetaData {
        self.trace("getMetaData");
        ConnectionMetaData::generic()
    }

    fn owned_handle(&self) -> ConnectorResult<&H> {
        match &self.slot {
            Slot::Destroyed => Err(ConnectorError::ConnectionDestroyed),
            _ => self.handle().ok_or(ConnectorError::NoHandleAssigned),
        }
    }

    /// Forgets the slot's handle once another connection has taken it over.
    fn release_transferred(&mut self) {
        if let Slot::Active(handle) = &self.slot {
            if handle.owner() != Some(self.id) {
                debug!(
                    connection = %self.id,
                    handle = %handle.id(),
                    owner = ?handle.owner(),
                    "handle taken over by another connection"
                );
                self.slot = Slot::Unassigned;
            }
        }
    }

    /// Builds one event for `kind` and delivers it to every listener in
    /// registration order. Stops at the first listener error.
    fn fire(&self, kind: ConnectionEventKind) -> ConnectorResult<()> {
        let event = ConnectionEvent::new(kind, self.id, self.owned_handle()?.clone());
        trace!(
            connection = %self.id,
            kind = %kind,
            listeners = self.listeners.len(),
            "firing connection event"
        );
        for listener in &self.listeners {
            event
                .dispatch(listener.as_ref())
                .map_err(ConnectorError::Listener)?;
        }
        Ok(())
    }

    fn trace(&self, operation: &str) {
        trace!(connection = %self.id, operation, "managed connection call");
        if let Some(writer) = &self.log_writer {
            writer.println(format_args!("#ManagedConnection.{operation}"));
        }
    }

    fn trace_with(&self, operation: &str, detail: impl fmt::Display) {
        trace!(connection = %self.id, operation, %detail, "managed connection call");
        if let Some(writer) = &self.log_writer {
            writer.println(format_args!("#ManagedConnection.{operation} {detail}"));
        }
    }
}

impl<H: ResourceHandle> LocalTransaction for ManagedConnection<H> {
    fn begin(&mut self) -> ConnectorResult<()> {
        self.trace("begin");
        self.release_transferred();
        self.owned_handle()?.begin()?;
        self.fire(ConnectionEventKind::TransactionStarted)
    }

    fn commit(&mut self) -> ConnectorResult<()> {
        self.trace("commit");
        self.release_transferred();
        self.owned_handle()?.commit()?;
        self.fire(ConnectionEventKind::TransactionCommitted)
    }

    fn rollback(&mut self) -> ConnectorResult<()> {
        self.trace("rollback");
        self.release_transferred();
        self.owned_handle()?.rollback()?;
        self.fire(ConnectionEventKind::TransactionRolledBack)
    }
}

impl<H: ResourceHandle> PartialEq for ManagedConnection<H> {
    fn eq(&self, other: &Self) -> bool {
        self.request_info == other.request_info
    }
}

impl<H: ResourceHandle> Eq for ManagedConnection<H> {}

impl<H: ResourceHandle> Hash for ManagedConnection<H> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.request_info.hash(state);
    }
}

impl<H: ResourceHandle> fmt::Debug for ManagedConnection<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("root_directory", &self.root_directory)
            .field("request_info", &self.request_info)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerResult;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    fn connection(info: Option<ConnectionRequestInfo>) -> (TempDir, ManagedConnection) {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectorConfig::new().root_directory(dir.path().join("root"));
        (dir, ManagedConnection::new(&config, info))
    }

    fn recorder() -> (
        Arc<Mutex<Vec<ConnectionEventKind>>>,
        Arc<dyn ConnectionEventListener>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Arc<dyn ConnectionEventListener> =
            Arc::new(move |event: &ConnectionEvent| -> ListenerResult {
                sink.lock().push(event.kind());
                Ok(())
            });
        (seen, listener)
    }

    #[test]
    fn new_connection_is_unassigned() {
        let (_dir, mc) = connection(None);
        assert_eq!(mc.state(), ConnectionState::Unassigned);
        assert!(mc.handle().is_none());
        assert_eq!(mc.listener_count(), 0);
    }

    #[test]
    fn get_connection_assigns_handle() {
        let (_dir, mut mc) = connection(None);
        let handle = mc.get_connection(None, None).unwrap();

        assert_eq!(mc.state(), ConnectionState::Active);
        assert_eq!(mc.handle().map(ResourceHandle::id), Some(handle.id()));
        assert_eq!(handle.owner(), Some(mc.id()));
        assert_eq!(handle.root(), mc.root_directory());
    }

    #[test]
    fn second_get_connection_is_refused() {
        let (_dir, mut mc) = connection(None);
        let first = mc.get_connection(None, None).unwrap();

        let result = mc.get_connection(None, None);
        assert!(matches!(result, Err(ConnectorError::HandleAlreadyAssigned)));
        assert_eq!(mc.handle().map(ResourceHandle::id), Some(first.id()));
    }

    #[test]
    fn cleanup_allows_reuse() {
        let (_dir, mut mc) = connection(None);
        let first = mc.get_connection(None, None).unwrap();

        mc.cleanup().unwrap();
        assert_eq!(mc.state(), ConnectionState::Unassigned);
        assert!(!first.is_destroyed());

        let second = mc.get_connection(None, None).unwrap();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn begin_without_handle_fails_and_fires_nothing() {
        let (_dir, mut mc) = connection(None);
        let (seen, listener) = recorder();
        mc.add_connection_event_listener(listener);

        assert!(matches!(mc.begin(), Err(ConnectorError::NoHandleAssigned)));
        assert!(matches!(mc.close(), Err(ConnectorError::NoHandleAssigned)));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn transaction_events_follow_handle_calls() {
        let (_dir, mut mc) = connection(None);
        let bucket = mc.get_connection(None, None).unwrap();
        let (seen, listener) = recorder();
        mc.add_connection_event_listener(listener);

        mc.begin().unwrap();
        assert!(bucket.in_transaction());
        mc.rollback().unwrap();
        mc.local_transaction().begin().unwrap();
        mc.local_transaction().commit().unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                ConnectionEventKind::TransactionStarted,
                ConnectionEventKind::TransactionRolledBack,
                ConnectionEventKind::TransactionStarted,
                ConnectionEventKind::TransactionCommitted,
            ]
        );
    }

    #[test]
    fn handle_failure_suppresses_event() {
        let (_dir, mut mc) = connection(None);
        mc.get_connection(None, None).unwrap();
        let (seen, listener) = recorder();
        mc.add_connection_event_listener(listener);

        let result = mc.commit();
        assert!(matches!(
            result,
            Err(ConnectorError::Resource(
                filestore_storage::StorageError::NoTransaction
            ))
        ));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn close_keeps_handle_alive() {
        let (_dir, mut mc) = connection(None);
        let bucket = mc.get_connection(None, None).unwrap();

        mc.close().unwrap();
        assert!(!bucket.is_destroyed());
        assert_eq!(mc.state(), ConnectionState::Active);
    }

    #[test]
    fn destroy_retires_connection() {
        let (_dir, mut mc) = connection(None);
        let bucket = mc.get_connection(None, None).unwrap();
        let (seen, listener) = recorder();
        mc.add_connection_event_listener(listener);

        mc.destroy().unwrap();
        assert!(bucket.is_destroyed());
        assert_eq!(mc.state(), ConnectionState::Destroyed);
        assert!(seen.lock().is_empty());

        assert!(matches!(mc.destroy(), Err(ConnectorError::ConnectionDestroyed)));
        assert!(matches!(mc.begin(), Err(ConnectorError::ConnectionDestroyed)));
        assert!(matches!(mc.cleanup(), Err(ConnectorError::ConnectionDestroyed)));
        assert!(matches!(
            mc.get_connection(None, None),
            Err(ConnectorError::ConnectionDestroyed)
        ));
        assert_eq!(mc.state(), ConnectionState::Destroyed);
    }

    #[test]
    fn destroy_unassigned_connection() {
        let (_dir, mut mc) = connection(None);
        mc.destroy().unwrap();
        assert_eq!(mc.state(), ConnectionState::Destroyed);
    }

    #[test]
    fn associate_rejects_foreign_type() {
        let (_dir, mut mc) = connection(None);
        let result = mc.associate_connection(Box::new("not a bucket"));
        assert!(matches!(result, Err(ConnectorError::TypeMismatch { .. })));
        assert_eq!(mc.state(), ConnectionState::Unassigned);
    }

    #[test]
    fn associate_transfers_ownership() {
        let (_dir_a, mut a) = connection(None);
        let (_dir_b, mut b) = connection(None);
        let bucket = a.get_connection(None, None).unwrap();

        b.associate_connection(Box::new(bucket.clone())).unwrap();

        assert_eq!(bucket.owner(), Some(b.id()));
        assert_eq!(b.handle().map(ResourceHandle::id), Some(bucket.id()));
        b.begin().unwrap();
        assert!(bucket.in_transaction());

        assert_eq!(a.state(), ConnectionState::Unassigned);
        assert!(a.handle().is_none());
        assert!(matches!(a.rollback(), Err(ConnectorError::NoHandleAssigned)));
        assert!(bucket.in_transaction());

        a.destroy().unwrap();
        assert!(!bucket.is_destroyed());
        assert_eq!(b.state(), ConnectionState::Active);
    }

    #[test]
    fn xa_is_unsupported() {
        let (_dir, mc) = connection(None);
        assert!(mc.xa_resource().is_none());
    }

    #[test]
    fn metadata_is_fixed() {
        let (_dir, mc) = connection(None);
        assert_eq!(mc.metadata(), ConnectionMetaData::generic());
    }

    #[test]
    fn remove_unknown_listener_returns_false() {
        let (_dir, mut mc) = connection(None);
        let (_, listener) = recorder();
        assert!(!mc.remove_connection_event_listener(&listener));
    }
}
