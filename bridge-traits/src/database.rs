//! Database Abstraction Layer
//!
//! Defines the engine collaborator contract used by the query core: issue
//! opaque query text with positional parameters, get typed rows back. The
//! core treats the engine as synchronous with respect to a single call:
//! `query` returns only once the full result set is available or the
//! engine has failed.
//!
//! ## Design Philosophy
//!
//! Query construction and row interpretation live in the core; everything
//! engine-specific (connection pooling, journaling mode, statement caching)
//! lives behind this trait. The core never concatenates values into query
//! text; parameters always travel separately as [`QueryValue`]s.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration for adapter initialization
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or connection string
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,

    /// Statement cache capacity
    pub statement_cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_secs: 30,
            statement_cache_capacity: 100,
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_secs: 30,
            statement_cache_capacity: 100,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

// =============================================================================
// Query Result Types
// =============================================================================

/// A single result row as a map of column names to values
pub type QueryRow = std::collections::HashMap<String, QueryValue>;

/// A database value that can be null, integer, real, text, or blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl QueryValue {
    /// Convert to i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            QueryValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert to f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Real(r) => Some(*r),
            QueryValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Convert to &str if possible
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert to an owned String if possible
    pub fn as_string(&self) -> Option<String> {
        match self {
            QueryValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Convert to bytes if possible
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            QueryValue::Blob(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }
}

// =============================================================================
// Database Adapter Trait
// =============================================================================

/// Engine collaborator: executes opaque query text and yields typed rows.
///
/// Implementations must be thread-safe (`Send + Sync`); the query worker
/// context and the submitting context may both hold references to the same
/// adapter. Connection-level concurrency discipline (pooling, WAL, locking)
/// is entirely the implementation's business.
///
/// ## Safety
///
/// Implementations must use parameterized queries. Callers never
/// concatenate user input into query text; parameters arrive positionally
/// as [`QueryValue`]s.
#[async_trait::async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Execute a query and return all matching rows.
    ///
    /// Returns only once the full result set has been materialized or the
    /// engine has failed.
    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>>;

    /// Execute a query and return a single optional row.
    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>>;

    /// Execute a query and return exactly one row.
    ///
    /// Returns an error if no row is returned.
    async fn query_one(&self, query: &str, params: &[QueryValue]) -> Result<QueryRow>;

    /// Execute a statement that doesn't return rows (INSERT, UPDATE, DELETE).
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64>;

    /// Check that the engine connection is healthy.
    async fn health_check(&self) -> Result<()>;
}
