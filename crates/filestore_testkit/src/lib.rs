//! # FileStore Testkit
//!
//! Test utilities for FileStore.
//!
//! This crate provides:
//! - Temporary-directory connector fixtures
//! - Listeners that record or reject connection events
//! - A scripted resource handle with call counters and failure injection
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use filestore_testkit::prelude::*;
//!
//! #[test]
//! fn commit_fires_event() {
//!     let connector = TestConnector::new();
//!     let mut mc = connector.factory.create_managed_connection(None);
//!     // ... drive the connection
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod listeners;
pub mod scripted;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::listeners::*;
    pub use crate::scripted::*;
}

pub use fixtures::*;
pub use generators::*;
pub use listeners::*;
pub use scripted::*;
