//! # FileStore Storage
//!
//! Resource handles for FileStore.
//!
//! This crate provides the unit of work a managed connection hands out to
//! application code. A handle knows nothing about pools, listeners or
//! connection lifecycles; it only exposes local transaction bracketing and
//! its own data operations.
//!
//! ## Design Principles
//!
//! - One handle, one root directory, for the handle's whole life
//! - Clones share a session, so ownership can move between connections
//! - Errors are reported verbatim; no retries at this layer
//!
//! ## Available Handles
//!
//! - [`FileBucket`] - Transactional blob store over a directory
//!
//! ## Example
//!
//! ```rust
//! use filestore_storage::{FileBucket, ResourceHandle};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let bucket = FileBucket::open(dir.path()).unwrap();
//! bucket.begin().unwrap();
//! bucket.write("a.txt", b"hello").unwrap();
//! bucket.rollback().unwrap();
//! assert!(!bucket.exists("a.txt").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod error;
mod handle;
mod staging;
mod types;

pub use bucket::FileBucket;
pub use error::{StorageError, StorageResult};
pub use handle::ResourceHandle;
pub use types::{ConnectionId, HandleId};
