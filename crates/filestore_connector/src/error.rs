//! Error types for managed connections.

use filestore_storage::StorageError;
use thiserror::Error;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Error a listener may return while handling a connection event.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by connection event listeners.
pub type ListenerResult = Result<(), ListenerError>;

/// Errors that can occur in managed connection operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A transaction or close call was made before any handle was
    /// created or associated.
    #[error("no resource handle is assigned to this managed connection")]
    NoHandleAssigned,

    /// `associate_connection` was given a value of a foreign handle type.
    #[error("cannot associate connection handle: expected {expected}")]
    TypeMismatch {
        /// Type name of the handle this connection manages.
        expected: &'static str,
    },

    /// The resource handle failed. Reported exactly as the handle raised it.
    #[error(transparent)]
    Resource(#[from] StorageError),

    /// `get_connection` was called while a handle is still owned.
    #[error("a resource handle is already assigned to this managed connection")]
    HandleAlreadyAssigned,

    /// The managed connection has been destroyed.
    #[error("managed connection has been destroyed")]
    ConnectionDestroyed,

    /// A connection event listener failed; later listeners were not notified.
    #[error("connection event listener failed: {0}")]
    Listener(#[source] ListenerError),

    /// The connector configuration could not be parsed.
    #[error("invalid connector configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl ConnectorError {
    /// Creates a type mismatch error for the handle type `H`.
    pub fn type_mismatch<H>() -> Self {
        Self::TypeMismatch {
            expected: std::any::type_name::<H>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_errors_display_verbatim() {
        let err = ConnectorError::from(StorageError::NoTransaction);
        assert_eq!(err.to_string(), StorageError::NoTransaction.to_string());
    }

    #[test]
    fn type_mismatch_names_expected_type() {
        let err = ConnectorError::type_mismatch::<u32>();
        assert_eq!(
            err.to_string(),
            "cannot associate connection handle: expected u32"
        );
    }
}
