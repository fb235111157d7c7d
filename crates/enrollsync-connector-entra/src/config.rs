//! Configuration for the Intune Graph clients.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{EntraError, EntraResult};

/// Graph API version hosting the imported-identity endpoints.
pub const DEFAULT_API_VERSION: &str = "beta";

/// Microsoft cloud the tenant lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntraCloudEnvironment {
    #[default]
    Commercial,
    UsGovernment,
    China,
    /// Explicit endpoints, for sovereign clouds and mock servers.
    Custom {
        login_endpoint: String,
        graph_endpoint: String,
    },
}

impl EntraCloudEnvironment {
    /// Token endpoint host.
    #[must_use]
    pub fn login_endpoint(&self) -> &str {
        match self {
            EntraCloudEnvironment::Commercial => "https://login.microsoftonline.com",
            EntraCloudEnvironment::UsGovernment => "https://login.microsoftonline.us",
            EntraCloudEnvironment::China => "https://login.chinacloudapi.cn",
            EntraCloudEnvironment::Custom { login_endpoint, .. } => {
                login_endpoint.trim_end_matches('/')
            }
        }
    }

    /// Graph API host.
    #[must_use]
    pub fn graph_endpoint(&self) -> &str {
        match self {
            EntraCloudEnvironment::Commercial => "https://graph.microsoft.com",
            EntraCloudEnvironment::UsGovernment => "https://graph.microsoft.us",
            EntraCloudEnvironment::China => "https://microsoftgraph.chinacloudapi.cn",
            EntraCloudEnvironment::Custom { graph_endpoint, .. } => {
                graph_endpoint.trim_end_matches('/')
            }
        }
    }
}

impl fmt::Display for EntraCloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntraCloudEnvironment::Commercial => write!(f, "commercial"),
            EntraCloudEnvironment::UsGovernment => write!(f, "us_government"),
            EntraCloudEnvironment::China => write!(f, "china"),
            EntraCloudEnvironment::Custom { graph_endpoint, .. } => {
                write!(f, "custom({graph_endpoint})")
            }
        }
    }
}

impl FromStr for EntraCloudEnvironment {
    type Err = EntraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commercial" | "public" | "global" => Ok(EntraCloudEnvironment::Commercial),
            "us_government" | "usgovernment" | "gcc_high" => {
                Ok(EntraCloudEnvironment::UsGovernment)
            }
            "china" => Ok(EntraCloudEnvironment::China),
            other => Err(EntraError::Config(format!(
                "unknown cloud environment '{other}', expected one of: commercial, us_government, china"
            ))),
        }
    }
}

/// App registration credentials for the client-credentials flow.
#[derive(Debug, Clone)]
pub struct EntraCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl EntraCredentials {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }
}

/// Tenant and transport settings shared by the directory and inventory clients.
#[derive(Debug, Clone)]
pub struct EntraConfig {
    pub tenant_id: String,
    pub cloud_environment: EntraCloudEnvironment,
    pub api_version: String,
    /// Attempts after the first for throttled or 5xx responses.
    pub max_retries: u32,
    /// First backoff delay for 5xx responses, doubled per attempt.
    pub initial_backoff: Duration,
    /// Upper bound on a server-provided `Retry-After`.
    pub max_retry_after: Duration,
    pub request_timeout: Duration,
}

impl EntraConfig {
    #[must_use]
    pub fn builder() -> EntraConfigBuilder {
        EntraConfigBuilder::default()
    }

    /// Base URL for Graph requests, e.g. `https://graph.microsoft.com/beta`.
    #[must_use]
    pub fn graph_base_url(&self) -> String {
        format!(
            "{}/{}",
            self.cloud_environment.graph_endpoint(),
            self.api_version
        )
    }
}

/// Builder for [`EntraConfig`].
#[derive(Debug, Default)]
#[must_use]
pub struct EntraConfigBuilder {
    tenant_id: Option<String>,
    cloud_environment: EntraCloudEnvironment,
    api_version: Option<String>,
    max_retries: Option<u32>,
    initial_backoff: Option<Duration>,
    max_retry_after: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl EntraConfigBuilder {
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn cloud_environment(mut self, env: EntraCloudEnvironment) -> Self {
        self.cloud_environment = env;
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    pub fn max_retry_after(mut self, delay: Duration) -> Self {
        self.max_retry_after = Some(delay);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EntraError::Config`] if the tenant id is missing or blank.
    pub fn build(self) -> EntraResult<EntraConfig> {
        let tenant_id = self
            .tenant_id
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EntraError::Config("tenant_id is required".to_string()))?;

        let api_version = self
            .api_version
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        if api_version.is_empty() || api_version.contains('/') {
            return Err(EntraError::Config(format!(
                "invalid api_version '{api_version}'"
            )));
        }

        Ok(EntraConfig {
            tenant_id,
            cloud_environment: self.cloud_environment,
            api_version,
            max_retries: self.max_retries.unwrap_or(5),
            initial_backoff: self.initial_backoff.unwrap_or(Duration::from_secs(1)),
            max_retry_after: self.max_retry_after.unwrap_or(Duration::from_secs(120)),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
        })
    }
}
