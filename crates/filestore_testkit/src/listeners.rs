//! Connection event listeners for tests.

use filestore_connector::{
    ConnectionEvent, ConnectionEventKind, ConnectionEventListener, ListenerResult,
};
use filestore_storage::{ConnectionId, HandleId, ResourceHandle};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// One event as seen by a [`RecordingListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Name of the listener that saw the event.
    pub listener: &'static str,
    /// Kind of the event.
    pub kind: ConnectionEventKind,
    /// Connection that fired the event.
    pub source: ConnectionId,
    /// Handle attached to the event.
    pub handle: HandleId,
}

/// Shared, ordered journal of events seen by one or more listeners.
///
/// Give several listeners the same journal to assert delivery order
/// across listeners.
#[derive(Debug, Default)]
pub struct EventJournal {
    events: Mutex<Vec<RecordedEvent>>,
}

impl EventJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in delivery order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded event kinds in delivery order.
    pub fn kinds(&self) -> Vec<ConnectionEventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    /// Returns the names of the listeners in delivery order.
    pub fn listeners(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.listener).collect()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    fn record<H: ResourceHandle>(&self, listener: &'static str, event: &ConnectionEvent<H>) {
        self.events.lock().push(RecordedEvent {
            listener,
            kind: event.kind(),
            source: event.source(),
            handle: event.handle().id(),
        });
    }
}

/// Listener that appends every event it receives to a journal.
pub struct RecordingListener {
    name: &'static str,
    journal: Arc<EventJournal>,
}

impl RecordingListener {
    /// Creates a listener with its own journal.
    pub fn new(name: &'static str) -> Self {
        Self::with_journal(name, Arc::new(EventJournal::new()))
    }

    /// Creates a listener writing to a shared journal.
    pub fn with_journal(name: &'static str, journal: Arc<EventJournal>) -> Self {
        Self { name, journal }
    }

    /// Returns this listener's journal.
    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }
}

impl<H: ResourceHandle> ConnectionEventListener<H> for RecordingListener {
    fn local_transaction_started(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self.journal.record(self.name, event);
        Ok(())
    }

    fn local_transaction_committed(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self.journal.record(self.name, event);
        Ok(())
    }

    fn local_transaction_rolled_back(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self.journal.record(self.name, event);
        Ok(())
    }

    fn connection_closed(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self.journal.record(self.name, event);
        Ok(())
    }
}

/// Error returned by a [`FailingListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerRejected(pub ConnectionEventKind);

impl fmt::Display for ListenerRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener rejected {} event", self.0)
    }
}

impl std::error::Error for ListenerRejected {}

/// Listener that fails on one event kind and accepts the others.
pub struct FailingListener {
    fail_on: ConnectionEventKind,
}

impl FailingListener {
    /// Creates a listener that fails whenever it receives `fail_on`.
    pub fn new(fail_on: ConnectionEventKind) -> Self {
        Self { fail_on }
    }

    fn check(&self, kind: ConnectionEventKind) -> ListenerResult {
        if kind == self.fail_on {
            Err(Box::new(ListenerRejected(kind)))
        } else {
            Ok(())
        }
    }
}

impl<H: ResourceHandle> ConnectionEventListener<H> for FailingListener {
    fn local_transaction_started(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self.check(event.kind())
    }

    fn local_transaction_committed(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self.check(event.kind())
    }

    fn local_transaction_rolled_back(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self.check(event.kind())
    }

    fn connection_closed(&self, event: &ConnectionEvent<H>) -> ListenerResult {
        self.check(event.kind())
    }
}
