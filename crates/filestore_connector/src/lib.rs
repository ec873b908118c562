//! # FileStore Connector
//!
//! Pooled, transactional managed connections over FileStore resource handles.
//!
//! This crate provides:
//! - [`ManagedConnection`]: the lifecycle state machine a pool drives
//! - Local transaction bracketing through [`LocalTransaction`]
//! - Synchronous event delivery to [`ConnectionEventListener`]s
//! - [`ManagedConnectionFactory`] for creating and matching connections
//!
//! Distributed (two-phase) transactions are not supported.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connection;
mod error;
mod event;
mod factory;
mod log_writer;
mod metadata;
mod request_info;
mod transaction;

pub use config::ConnectorConfig;
pub use connection::{ConnectionState, ManagedConnection};
pub use error::{ConnectorError, ConnectorResult, ListenerError, ListenerResult};
pub use event::{ConnectionEvent, ConnectionEventKind, ConnectionEventListener};
pub use factory::ManagedConnectionFactory;
pub use log_writer::LogWriter;
pub use metadata::{ConnectionMetaData, MAX_CONNECTIONS, PRODUCT_NAME, PRODUCT_VERSION};
pub use request_info::{ConnectionRequestInfo, Credentials};
pub use transaction::{LocalTransaction, XaResource};

pub use filestore_storage::{
    ConnectionId, FileBucket, HandleId, ResourceHandle, StorageError, StorageResult,
};
