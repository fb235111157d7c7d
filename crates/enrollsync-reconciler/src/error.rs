//! Reconciler error types.
//!
//! Only run-level failures are errors. Per-device failures are recorded as
//! [`DeviceOutcome::Failed`](crate::DeviceOutcome::Failed) and never abort a run.

use thiserror::Error;

use enrollsync_connector::ConnectorError;

/// Errors that abort a whole flow run.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    InvalidConfiguration { message: String },

    /// The registry could not be queried.
    #[error("Registry read failed: {0}")]
    RegistryRead(#[source] ConnectorError),

    /// The tag policy could not be loaded.
    #[error("Tag policy lookup failed: {0}")]
    TagPolicy(#[source] ConnectorError),
}

impl ReconcilerError {
    /// Whether the next scheduled run is expected to succeed without intervention.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcilerError::InvalidConfiguration { .. } => false,
            ReconcilerError::RegistryRead(e) | ReconcilerError::TagPolicy(e) => e.is_transient(),
        }
    }
}

/// Result type for flow runs.
pub type ReconcilerResult<T> = Result<T, ReconcilerError>;
