//! Managed connection factory.

use crate::config::ConnectorConfig;
use crate::connection::{ConnectionState, ManagedConnection};
use crate::log_writer::LogWriter;
use crate::request_info::ConnectionRequestInfo;
use filestore_storage::{FileBucket, ResourceHandle};
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Creates and matches managed connections for a pool.
///
/// Every connection the factory creates shares its configuration and its
/// diagnostic sink.
pub struct ManagedConnectionFactory<H: ResourceHandle = FileBucket> {
    config: ConnectorConfig,
    log_writer: Option<LogWriter>,
    _handle: PhantomData<fn() -> H>,
}

impl ManagedConnectionFactory {
    /// Creates a factory for [`FileBucket`] connections.
    #[must_use]
    pub fn new(config: ConnectorConfig) -> Self {
        Self::for_handle(config)
    }
}

impl<H: ResourceHandle> ManagedConnectionFactory<H> {
    /// Creates a factory for connections over handles of type `H`.
    #[must_use]
    pub fn for_handle(config: ConnectorConfig) -> Self {
        Self {
            config,
            log_writer: None,
            _handle: PhantomData,
        }
    }

    /// Sets the diagnostic sink passed to every new connection.
    #[must_use]
    pub fn with_log_writer(mut self, log_writer: LogWriter) -> Self {
        self.log_writer = Some(log_writer);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Returns the diagnostic sink, if one was configured.
    #[must_use]
    pub fn log_writer(&self) -> Option<&LogWriter> {
        self.log_writer.as_ref()
    }

    /// Creates a managed connection with no handle and no listeners.
    #[must_use]
    pub fn create_managed_connection(
        &self,
        request_info: Option<ConnectionRequestInfo>,
    ) -> ManagedConnection<H> {
        if let Some(writer) = &self.log_writer {
            writer.println("#ManagedConnectionFactory.createManagedConnection");
        }
        let connection = ManagedConnection::new(&self.config, request_info);
        match &self.log_writer {
            Some(writer) => connection.with_log_writer(writer.clone()),
            None => connection,
        }
    }

    /// Picks the first candidate that can serve a request with `request_info`.
    ///
    /// A candidate matches when its request info equals `request_info` and
    /// it has not been destroyed.
    pub fn match_managed_connections<'a, I>(
        &self,
        candidates: I,
        request_info: Option<&ConnectionRequestInfo>,
    ) -> Option<&'a ManagedConnection<H>>
    where
        I: IntoIterator<Item = &'a ManagedConnection<H>>,
    {
        if let Some(writer) = &self.log_writer {
            writer.println("#ManagedConnectionFactory.matchManagedConnections");
        }
        let found = candidates.into_iter().find(|candidate| {
            candidate.state() != ConnectionState::Destroyed
                && candidate.request_info() == request_info
        });
        debug!(matched = ?found.map(ManagedConnection::id), "matched managed connections");
        found
    }
}

impl<H: ResourceHandle> Clone for ManagedConnectionFactory<H> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            log_writer: self.log_writer.clone(),
            _handle: PhantomData,
        }
    }
}

impl<H: ResourceHandle> fmt::Debug for ManagedConnectionFactory<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnectionFactory")
            .field("config", &self.config)
            .field("log_writer", &self.log_writer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> (tempfile::TempDir, ManagedConnectionFactory) {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectorConfig::new().root_directory(dir.path());
        (dir, ManagedConnectionFactory::new(config))
    }

    #[test]
    fn created_connections_use_factory_config() {
        let (dir, factory) = factory();
        let info = ConnectionRequestInfo::new().with_user_name("duke");

        let mc = factory.create_managed_connection(Some(info.clone()));
        assert_eq!(mc.root_directory(), dir.path());
        assert_eq!(mc.request_info(), Some(&info));
        assert_eq!(mc.state(), ConnectionState::Unassigned);
    }

    #[test]
    fn match_finds_equal_request_info() {
        let (_dir, factory) = factory();
        let r1 = ConnectionRequestInfo::new().with_user_name("r1");
        let r2 = ConnectionRequestInfo::new().with_user_name("r2");

        let pool = vec![
            factory.create_managed_connection(Some(r1)),
            factory.create_managed_connection(Some(r2.clone())),
            factory.create_managed_connection(None),
        ];

        let matched = factory.match_managed_connections(&pool, Some(&r2)).unwrap();
        assert_eq!(matched.id(), pool[1].id());

        let unnamed = factory.match_managed_connections(&pool, None).unwrap();
        assert_eq!(unnamed.id(), pool[2].id());

        let r3 = ConnectionRequestInfo::new().with_user_name("r3");
        assert!(factory.match_managed_connections(&pool, Some(&r3)).is_none());
    }

    #[test]
    fn match_skips_destroyed() {
        let (_dir, factory) = factory();
        let mut retired = factory.create_managed_connection(None);
        retired.destroy().unwrap();
        let live = factory.create_managed_connection(None);

        let pool = [retired, live];
        let matched = factory.match_managed_connections(&pool, None).unwrap();
        assert_eq!(matched.id(), pool[1].id());
    }
}
