//! Connection request information and credentials.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity and configuration a client passes when it asks for a connection.
///
/// The pool uses this value to match an idle managed connection to a new
/// request: two managed connections are interchangeable exactly when their
/// request info is equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionRequestInfo {
    user_name: Option<String>,
    properties: BTreeMap<String, String>,
}

impl ConnectionRequestInfo {
    /// Creates empty request info.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user name.
    #[must_use]
    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// Adds a property, replacing any earlier value for `key`.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the user name, if set.
    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// Returns the value of property `key`, if set.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Credentials supplied by the container when a connection is requested.
///
/// The file-backed resource does not authenticate, so credentials are only
/// recorded in diagnostics. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user_name: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
        }
    }

    /// Returns the user name.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let info = ConnectionRequestInfo::new()
            .with_user_name("duke")
            .with_property("bucket", "invoices");

        assert_eq!(info.user_name(), Some("duke"));
        assert_eq!(info.property("bucket"), Some("invoices"));
        assert_eq!(info.property("missing"), None);
    }

    #[test]
    fn property_order_does_not_affect_equality() {
        let a = ConnectionRequestInfo::new()
            .with_property("x", "1")
            .with_property("y", "2");
        let b = ConnectionRequestInfo::new()
            .with_property("y", "2")
            .with_property("x", "1");
        assert_eq!(a, b);
    }

    #[test]
    fn json_roundtrip_preserves_equality() {
        let info = ConnectionRequestInfo::new().with_user_name("duke");
        let json = serde_json::to_string(&info).unwrap();
        let back: ConnectionRequestInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, back);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("duke", "s3cret");
        let shown = format!("{creds:?}");
        assert!(shown.contains("duke"));
        assert!(!shown.contains("s3cret"));
        assert_eq!(creds.password(), "s3cret");
    }
}
