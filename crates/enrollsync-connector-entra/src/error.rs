//! Error types for the Intune Graph clients.

use thiserror::Error;

use enrollsync_connector::ConnectorError;

/// Result type alias using `EntraError`.
pub type EntraResult<T> = Result<T, EntraError>;

/// Errors that can occur when calling Microsoft Graph.
#[derive(Debug, Error)]
pub enum EntraError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `OAuth2` authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Non-success response from Microsoft Graph.
    #[error("Graph API error ({status}): {code} - {message}")]
    GraphApi {
        status: u16,
        code: String,
        message: String,
    },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Still throttled after the retry budget was spent.
    #[error("Rate limit exceeded after {attempts} attempts, retry after {retry_after_secs} seconds")]
    RateLimited { attempts: u32, retry_after_secs: u64 },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Response was well formed but did not contain what was asked for.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl EntraError {
    /// HTTP status of a Graph error response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            EntraError::GraphApi { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        self.status() == Some(400)
    }

    /// Throttling, 5xx and transport failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            EntraError::GraphApi { status, .. } => *status == 429 || *status >= 500,
            EntraError::RateLimited { .. } => true,
            EntraError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

impl From<EntraError> for ConnectorError {
    fn from(err: EntraError) -> Self {
        match err {
            EntraError::Config(message) => ConnectorError::InvalidConfiguration { message },
            EntraError::Auth(message) => ConnectorError::AuthenticationFailed { message },
            EntraError::GraphApi {
                status,
                code,
                message,
            } => match status {
                401 => ConnectorError::AuthenticationFailed { message },
                403 => ConnectorError::AuthorizationFailed { operation: message },
                404 => ConnectorError::ObjectNotFound {
                    identifier: message,
                },
                429 | 500..=599 => ConnectorError::TargetUnavailable {
                    message: format!("{status} {code}: {message}"),
                },
                _ => ConnectorError::Rejected { code, message },
            },
            EntraError::RateLimited {
                attempts,
                retry_after_secs,
            } => ConnectorError::TargetUnavailable {
                message: format!(
                    "throttled after {attempts} attempts, retry after {retry_after_secs}s"
                ),
            },
            EntraError::Http(e) => ConnectorError::network_with_source("Graph request failed", e),
            EntraError::Json(e) => ConnectorError::invalid_data(format!(
                "failed to decode Graph response: {e}"
            )),
            EntraError::Url(e) => ConnectorError::InvalidConfiguration {
                message: format!("invalid Graph URL: {e}"),
            },
            EntraError::UnexpectedResponse(message) => ConnectorError::InvalidData { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(status: u16) -> EntraError {
        EntraError::GraphApi {
            status,
            code: "Code".to_string(),
            message: "msg".to_string(),
        }
    }

    #[test]
    fn test_status_helpers() {
        assert!(graph(404).is_not_found());
        assert!(graph(400).is_bad_request());
        assert!(!graph(400).is_not_found());
        assert!(EntraError::Config("x".into()).status().is_none());
    }

    #[test]
    fn test_transient_classification() {
        assert!(graph(429).is_transient());
        assert!(graph(503).is_transient());
        assert!(!graph(400).is_transient());
        assert!(!EntraError::Auth("bad secret".into()).is_transient());
    }

    #[test]
    fn test_into_connector_error() {
        let err: ConnectorError = graph(503).into();
        assert!(err.is_transient());

        let err: ConnectorError = graph(403).into();
        assert_eq!(err.error_code(), "AUTHORIZATION_FAILED");

        let err: ConnectorError = graph(409).into();
        assert!(matches!(err, ConnectorError::Rejected { .. }));

        let err: ConnectorError = EntraError::Auth("expired".into()).into();
        assert!(err.is_permanent());
    }
}
