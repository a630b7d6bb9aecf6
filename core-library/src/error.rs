use bridge_traits::error::BridgeError;
use thiserror::Error;

use crate::metadata::query::QueryState;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Query is {actual:?} but the operation requires {expected:?}")]
    InvalidState {
        expected: QueryState,
        actual: QueryState,
    },

    #[error("Completion callbacks already delivered for query {0}")]
    AlreadyDelivered(String),

    #[error("Query host is not accepting submissions")]
    HostUnavailable,

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl LibraryError {
    /// Whether resubmitting an equivalent query may succeed.
    ///
    /// Engine-side failures are worth retrying; protocol misuse is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LibraryError::Database(_) | LibraryError::Bridge(_))
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
