//! Connector configuration.

use crate::error::ConnectorResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default root directory for buckets.
const DEFAULT_ROOT_DIRECTORY: &str = "filestore";

/// Configuration shared by every managed connection a factory creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Directory that handles created by a connection are rooted at.
    pub root_directory: PathBuf,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            root_directory: PathBuf::from(DEFAULT_ROOT_DIRECTORY),
        }
    }
}

impl ConnectorConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory.
    #[must_use]
    pub fn root_directory(mut self, path: impl AsRef<Path>) -> Self {
        self.root_directory = path.as_ref().to_path_buf();
        self
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the input is not a valid configuration.
    pub fn from_json(json: &str) -> ConnectorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
