//! # Core Configuration Module
//!
//! Configuration for the metadata query core, built with a fail-fast
//! builder: every setting is validated before a [`CoreConfig`] is handed
//! out, so a misconfigured host dies at startup with an actionable message
//! instead of misbehaving later.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/library/metadata.db")
//!     .max_connections(8)
//!     .query_queue_depth(64)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// In-memory marker accepted in place of a database file path.
const IN_MEMORY_PATH: &str = ":memory:";

/// Core configuration for the metadata query subsystem.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub database_path: PathBuf,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,

    /// Prepared statement cache capacity
    pub statement_cache_capacity: usize,

    /// Bound of the query submission queue (backpressure on the worker)
    pub query_queue_depth: usize,

    /// Buffer size of the lifecycle event bus
    pub event_buffer_size: usize,
}

impl CoreConfig {
    /// Start building a configuration.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Configuration backed by an in-memory database, sized for tests.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_secs: 30,
            statement_cache_capacity: 100,
            query_queue_depth: 32,
            event_buffer_size: 100,
        }
    }

    /// Whether this configuration uses an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY_PATH)
    }
}

/// Builder for [`CoreConfig`] with fail-fast validation.
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    min_connections: Option<u32>,
    max_connections: Option<u32>,
    acquire_timeout_secs: Option<u64>,
    statement_cache_capacity: Option<usize>,
    query_queue_depth: Option<usize>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Set the database file path (required unless `in_memory` is used).
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Use an in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.database_path = Some(PathBuf::from(IN_MEMORY_PATH));
        self
    }

    /// Set the minimum number of pooled connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = Some(min);
        self
    }

    /// Set the maximum number of pooled connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Set the connection acquire timeout in seconds.
    pub fn acquire_timeout_secs(mut self, secs: u64) -> Self {
        self.acquire_timeout_secs = Some(secs);
        self
    }

    /// Set the prepared statement cache capacity.
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = Some(capacity);
        self
    }

    /// Set the bound of the query submission queue.
    pub fn query_queue_depth(mut self, depth: usize) -> Self {
        self.query_queue_depth = Some(depth);
        self
    }

    /// Set the lifecycle event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Validate the settings and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the database path is missing, the pool
    /// bounds are inverted or zero, or a queue/buffer bound is zero.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config(
                "database_path is required. \
                 Provide a file path, or call in_memory() for tests."
                    .to_string(),
            )
        })?;

        let min_connections = self.min_connections.unwrap_or(1);
        let max_connections = self.max_connections.unwrap_or(5);
        let acquire_timeout_secs = self.acquire_timeout_secs.unwrap_or(30);
        let statement_cache_capacity = self.statement_cache_capacity.unwrap_or(100);
        let query_queue_depth = self.query_queue_depth.unwrap_or(32);
        let event_buffer_size = self.event_buffer_size.unwrap_or(100);

        if max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if min_connections > max_connections {
            return Err(Error::Config(format!(
                "min_connections ({}) cannot exceed max_connections ({})",
                min_connections, max_connections
            )));
        }

        if acquire_timeout_secs == 0 {
            return Err(Error::Config(
                "acquire_timeout_secs must be at least 1".to_string(),
            ));
        }

        if query_queue_depth == 0 {
            return Err(Error::Config(
                "query_queue_depth must be at least 1; a zero-depth queue \
                 would reject every submission"
                    .to_string(),
            ));
        }

        if event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be at least 1".to_string(),
            ));
        }

        Ok(CoreConfig {
            database_path,
            min_connections,
            max_connections,
            acquire_timeout_secs,
            statement_cache_capacity,
            query_queue_depth,
            event_buffer_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_with_defaults() {
        let config = CoreConfig::builder()
            .database_path("library.db")
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("library.db"));
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.query_queue_depth, 32);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn builder_requires_database_path() {
        let err = CoreConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("database_path"));
    }

    #[test]
    fn builder_rejects_inverted_pool_bounds() {
        let err = CoreConfig::builder()
            .in_memory()
            .min_connections(10)
            .max_connections(2)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("min_connections"));
    }

    #[test]
    fn builder_rejects_zero_queue_depth() {
        let err = CoreConfig::builder()
            .in_memory()
            .query_queue_depth(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("query_queue_depth"));
    }

    #[test]
    fn in_memory_marker() {
        let config = CoreConfig::in_memory();
        assert!(config.is_in_memory());

        let built = CoreConfig::builder().in_memory().build().unwrap();
        assert!(built.is_in_memory());
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = CoreConfig::builder()
            .database_path("metadata.db")
            .max_connections(8)
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: CoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
