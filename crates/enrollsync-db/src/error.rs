//! Error types for the enrollsync-db crate.
//!
//! Wraps `SQLx` errors with context and maps them onto the collaborator error
//! type used by the reconciler.

use thiserror::Error;

use enrollsync_connector::ConnectorError;

/// Database operation errors.
///
/// # Example
///
/// ```rust
/// use enrollsync_db::DbError;
///
/// fn handle_error(err: DbError) {
///     match err {
///         DbError::ConnectionFailed(e) => eprintln!("Cannot connect: {}", e),
///         DbError::MigrationFailed(e) => eprintln!("Migration error: {}", e),
///         DbError::QueryFailed(e) => eprintln!("Query error: {}", e),
///         DbError::NotFound(msg) => eprintln!("Not found: {}", msg),
///         DbError::ValidationFailed(msg) => eprintln!("Validation: {}", msg),
///         DbError::InvalidRow(msg) => eprintln!("Invalid row: {}", msg),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A database query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested change is not allowed for the current record state.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A stored row could not be converted into a domain value.
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

impl DbError {
    /// Check if this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            DbError::ConnectionFailed(_) => true,
            DbError::QueryFailed(e) => is_unavailable(e),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }

    #[must_use]
    pub fn is_validation_failed(&self) -> bool {
        matches!(self, DbError::ValidationFailed(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if is_unavailable(&err) {
            DbError::ConnectionFailed(err)
        } else {
            DbError::QueryFailed(err)
        }
    }
}

/// I/O and pool exhaustion are the store being unreachable, not a bad query.
fn is_unavailable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

impl From<DbError> for ConnectorError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionFailed(e) => {
                ConnectorError::store_unavailable_with_source("database unavailable", e)
            }
            DbError::QueryFailed(e) => ConnectorError::store_with_source("query failed", e),
            DbError::MigrationFailed(e) => {
                ConnectorError::store_with_source("migration failed", e)
            }
            DbError::NotFound(identifier) => ConnectorError::ObjectNotFound { identifier },
            DbError::ValidationFailed(message) => ConnectorError::Store {
                message,
                source: None,
            },
            DbError::InvalidRow(message) => ConnectorError::InvalidData { message },
        }
    }
}
