//! Connection events and listeners.
//!
//! A managed connection fires one event per lifecycle transition and
//! delivers it synchronously to every registered listener, in
//! registration order, before the triggering call returns.
//!
//! ```rust,ignore
//! use filestore_connector::{ConnectionEvent, ConnectionEventListener, ListenerResult};
//!
//! struct Audit;
//!
//! impl ConnectionEventListener for Audit {
//!     fn local_transaction_committed(&self, event: &ConnectionEvent) -> ListenerResult {
//!         println!("committed on {}", event.source());
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::ListenerResult;
use filestore_storage::{ConnectionId, FileBucket, ResourceHandle};
use std::fmt;

/// Kind of lifecycle transition an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEventKind {
    /// A local transaction was started.
    TransactionStarted,
    /// A local transaction was committed.
    TransactionCommitted,
    /// A local transaction was rolled back.
    TransactionRolledBack,
    /// The application closed its connection handle.
    Closed,
}

impl fmt::Display for ConnectionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TransactionStarted => "transaction-started",
            Self::TransactionCommitted => "transaction-committed",
            Self::TransactionRolledBack => "transaction-rolled-back",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An immutable record of one lifecycle transition.
#[derive(Debug, Clone)]
pub struct ConnectionEvent<H = FileBucket> {
    kind: ConnectionEventKind,
    source: ConnectionId,
    handle: H,
}

impl<H: ResourceHandle> ConnectionEvent<H> {
    pub(crate) fn new(kind: ConnectionEventKind, source: ConnectionId, handle: H) -> Self {
        Self {
            kind,
            source,
            handle,
        }
    }

    /// Returns the kind of transition.
    #[must_use]
    pub fn kind(&self) -> ConnectionEventKind {
        self.kind
    }

    /// Returns the managed connection that fired the event.
    #[must_use]
    pub fn source(&self) -> ConnectionId {
        self.source
    }

    /// Returns the handle the connection owned when the event fired.
    #[must_use]
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Delivers this event to the listener method matching its kind.
    ///
    /// # Errors
    ///
    /// Returns whatever the listener returns.
    pub fn dispatch<L>(&self, listener: &L) -> ListenerResult
    where
        L: ConnectionEventListener<H> + ?Sized,
    {
        match self.kind {
            ConnectionEventKind::TransactionStarted => listener.local_transaction_started(self),
            ConnectionEventKind::TransactionCommitted => {
                listener.local_transaction_committed(self)
            }
            ConnectionEventKind::TransactionRolledBack => {
                listener.local_transaction_rolled_back(self)
            }
            ConnectionEventKind::Closed => listener.connection_closed(self),
        }
    }
}

/// Observer of managed connection lifecycle events.
///
/// Every method defaults to doing nothing, so implementors only override
/// the transitions they care about. An error stops delivery of the current
/// event to the remaining listeners and is returned to the caller of the
/// operation that fired it.
///
/// Any `Fn(&ConnectionEvent<H>) -> ListenerResult` closure is a listener
/// that receives every event.
pub trait ConnectionEventListener<H: ResourceHandle = FileBucket>: Send + Sync {
    /// Called after a local transaction started.
    fn local_transaction_started(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        let _ = event;
        Ok(())
    }

    /// Called after a local transaction committed.
    fn local_transaction_committed(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        let _ = event;
        Ok(())
    }

    /// Called after a local transaction rolled back.
    fn local_transaction_rolled_back(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        let _ = event;
        Ok(())
    }

    /// Called after the connection handle was closed.
    fn connection_closed(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        let _ = event;
        Ok(())
    }
}

impl<H, F> ConnectionEventListener<H> for F
where
    H: ResourceHandle,
    F: Fn(&ConnectionEvent<H>) -> ListenerResult + Send + Sync,
{
    fn local_transaction_started(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self(event)
    }

    fn local_transaction_committed(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self(event)
    }

    fn local_transaction_rolled_back(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self(event)
    }

    fn connection_closed(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records which listener method was called.
    #[derive(Default)]
    struct MethodLog {
        calls: Mutex<Vec<&'static str>>,
    }

    impl ConnectionEventListener for MethodLog {
        fn local_transaction_started(&self, _: &ConnectionEvent) -> ListenerResult {
            self.calls.lock().push("started");
            Ok(())
        }

        fn local_transaction_committed(&self, _: &ConnectionEvent) -> ListenerResult {
            self.calls.lock().push("committed");
            Ok(())
        }

        fn local_transaction_rolled_back(&self, _: &ConnectionEvent) -> ListenerResult {
            self.calls.lock().push("rolled_back");
            Ok(())
        }

        fn connection_closed(&self, _: &ConnectionEvent) -> ListenerResult {
            self.calls.lock().push("closed");
            Ok(())
        }
    }

    fn bucket() -> (tempfile::TempDir, FileBucket) {
        let dir = tempfile::tempdir().unwrap();
        let bucket = FileBucket::open(&dir.path().join("b")).unwrap();
        (dir, bucket)
    }

    #[test]
    fn dispatch_calls_matching_method() {
        let (_dir, bucket) = bucket();
        let log = MethodLog::default();
        let source = ConnectionId::new();

        for kind in [
            ConnectionEventKind::TransactionStarted,
            ConnectionEventKind::TransactionCommitted,
            ConnectionEventKind::TransactionRolledBack,
            ConnectionEventKind::Closed,
        ] {
            ConnectionEvent::new(kind, source, bucket.clone())
                .dispatch(&log)
                .unwrap();
        }

        assert_eq!(
            *log.calls.lock(),
            vec!["started", "committed", "rolled_back", "closed"]
        );
    }

    #[test]
    fn event_exposes_fields() {
        let (_dir, bucket) = bucket();
        let source = ConnectionId::new();
        let event = ConnectionEvent::new(ConnectionEventKind::Closed, source, bucket.clone());

        assert_eq!(event.kind(), ConnectionEventKind::Closed);
        assert_eq!(event.source(), source);
        assert_eq!(event.handle().id(), bucket.id());
        assert_eq!(event.handle().root(), bucket.root());
    }

    #[test]
    fn closures_receive_every_kind() {
        let (_dir, bucket) = bucket();
        let seen = Mutex::new(Vec::new());
        let listener = |event: &ConnectionEvent| -> ListenerResult {
            seen.lock().push(event.kind());
            Ok(())
        };

        let source = ConnectionId::new();
        ConnectionEvent::new(ConnectionEventKind::TransactionStarted, source, bucket.clone())
            .dispatch(&listener)
            .unwrap();
        ConnectionEvent::new(ConnectionEventKind::Closed, source, bucket)
            .dispatch(&listener)
            .unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                ConnectionEventKind::TransactionStarted,
                ConnectionEventKind::Closed
            ]
        );
    }

    #[test]
    fn default_methods_accept_everything() {
        struct Silent;
        impl ConnectionEventListener for Silent {}

        let (_dir, bucket) = bucket();
        let event = ConnectionEvent::new(
            ConnectionEventKind::TransactionRolledBack,
            ConnectionId::new(),
            bucket,
        );
        assert!(event.dispatch(&Silent).is_ok());
    }

    #[test]
    fn kind_display() {
        assert_eq!(
            ConnectionEventKind::TransactionRolledBack.to_string(),
            "transaction-rolled-back"
        );
    }
}
