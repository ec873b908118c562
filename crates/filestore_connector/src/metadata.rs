//! Managed connection metadata.

/// Product name reported by every managed connection.
pub const PRODUCT_NAME: &str = "Generic JCA";

/// Product version reported by every managed connection.
pub const PRODUCT_VERSION: &str = "1.0";

/// Maximum number of concurrent connections the resource supports.
pub const MAX_CONNECTIONS: u32 = 5;

/// Fixed description of the resource behind a managed connection.
///
/// The values are constants of this connector; they are not queried from
/// the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetaData {
    /// Product name of the underlying resource.
    pub product_name: &'static str,
    /// Product version of the underlying resource.
    pub product_version: &'static str,
    /// Maximum number of concurrent connections.
    pub max_connections: u32,
    /// User name associated with the connection, if any.
    pub user_name: Option<String>,
}

impl ConnectionMetaData {
    /// Returns the metadata of this connector.
    #[must_use]
    pub const fn generic() -> Self {
        Self {
            product_name: PRODUCT_NAME,
            product_version: PRODUCT_VERSION,
            max_connections: MAX_CONNECTIONS,
            user_name: None,
        }
    }
}

impl Default for ConnectionMetaData {
    fn default() -> Self {
        Self::generic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_metadata_values() {
        let meta = ConnectionMetaData::generic();
        assert_eq!(meta.product_name, "Generic JCA");
        assert_eq!(meta.product_version, "1.0");
        assert_eq!(meta.max_connections, 5);
        assert_eq!(meta.user_name, None);
    }
}
