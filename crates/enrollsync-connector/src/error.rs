//! Collaborator error types
//!
//! Error definitions with transient/permanent classification. The reconciler
//! never retries inside a run; the classification only decides how a failure
//! is logged, since every failed device is picked up again next cycle.

use thiserror::Error;

/// Error that can occur when talking to the registry or an external system.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Transient
    /// Registry store is temporarily unavailable.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// External system is temporarily unavailable (throttling, 5xx).
    #[error("target system unavailable: {message}")]
    TargetUnavailable { message: String },

    /// Network error during communication.
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Permanent
    /// Credentials rejected by the external system.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Insufficient permissions for the operation.
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    /// Collaborator configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Object not found in the external system.
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },

    /// External system rejected the request.
    #[error("request rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// Invalid data returned by the external system or read from the store.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Non-transient registry store error.
    #[error("store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Check if this error is transient and the operation is expected to
    /// succeed on a later cycle without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::StoreUnavailable { .. }
                | ConnectorError::TargetUnavailable { .. }
                | ConnectorError::NetworkError { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            ConnectorError::TargetUnavailable { .. } => "TARGET_UNAVAILABLE",
            ConnectorError::NetworkError { .. } => "NETWORK_ERROR",
            ConnectorError::AuthenticationFailed { .. } => "AUTH_FAILED",
            ConnectorError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            ConnectorError::Rejected { .. } => "REJECTED",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
            ConnectorError::Store { .. } => "STORE_ERROR",
        }
    }

    // Convenience constructors

    /// Create a store unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        ConnectorError::StoreUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store unavailable error with source.
    pub fn store_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::StoreUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a store error with source.
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        ConnectorError::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::NetworkError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        ConnectorError::InvalidData {
            message: message.into(),
        }
    }
}

/// Result type for collaborator operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ConnectorError::store_unavailable("pool timed out").is_transient());
        assert!(ConnectorError::network("reset").is_transient());
        assert!(ConnectorError::TargetUnavailable {
            message: "429".into()
        }
        .is_transient());

        assert!(ConnectorError::AuthenticationFailed {
            message: "bad secret".into()
        }
        .is_permanent());
        assert!(ConnectorError::invalid_data("missing id").is_permanent());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ConnectorError::store_unavailable("x").error_code(),
            "STORE_UNAVAILABLE"
        );
        assert_eq!(
            ConnectorError::Rejected {
                code: "400".into(),
                message: "bad".into()
            }
            .error_code(),
            "REJECTED"
        );
    }

    #[test]
    fn test_display_includes_message() {
        let err = ConnectorError::ObjectNotFound {
            identifier: "dir-42".into(),
        };
        assert_eq!(err.to_string(), "object not found: dir-42");
    }
}
