//! Test fixtures and connector helpers.
//!
//! Provides factories rooted in temporary directories and a capturing
//! diagnostic sink.

use filestore_connector::{ConnectorConfig, LogWriter, ManagedConnectionFactory};
use filestore_storage::ResourceHandle;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// A connection factory rooted in a temporary directory.
///
/// The directory is removed when the fixture is dropped.
pub struct TestConnector<H: ResourceHandle = filestore_storage::FileBucket> {
    /// The factory under test.
    pub factory: ManagedConnectionFactory<H>,
    /// Everything written to the factory's diagnostic sink.
    pub log: CapturedLog,
    _temp_dir: TempDir,
}

impl TestConnector {
    /// Creates a fixture producing [`filestore_storage::FileBucket`] connections.
    pub fn new() -> Self {
        Self::for_handle()
    }
}

impl Default for TestConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ResourceHandle> TestConnector<H> {
    /// Creates a fixture producing connections over handles of type `H`.
    pub fn for_handle() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = ConnectorConfig::new().root_directory(temp_dir.path().join("buckets"));
        let log = CapturedLog::new();
        let factory = ManagedConnectionFactory::for_handle(config).with_log_writer(log.writer());

        Self {
            factory,
            log,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the root directory connections open handles at.
    pub fn root(&self) -> &Path {
        &self.factory.config().root_directory
    }
}

/// An in-memory sink that keeps every line written to it.
#[derive(Clone, Default)]
pub struct CapturedLog {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a [`LogWriter`] appending to this log.
    pub fn writer(&self) -> LogWriter {
        LogWriter::new(self.clone())
    }

    /// Returns the captured lines.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Returns true if any captured line equals `line`.
    pub fn contains(&self, line: &str) -> bool {
        self.lines().iter().any(|l| l == line)
    }
}

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Installs a `tracing` subscriber for tests, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
