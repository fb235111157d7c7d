//! Microsoft Intune collaborators for enrollsync
//!
//! Implements [`IdentityDirectory`](enrollsync_connector::IdentityDirectory) and
//! [`DeviceInventory`](enrollsync_connector::DeviceInventory) on top of the
//! Microsoft Graph API.
//!
//! # Features
//!
//! - `OAuth2` client credentials authentication with token caching
//! - Throttling (429 + `Retry-After`) and 5xx retry with exponential backoff
//! - Corporate device identifier import and removal
//! - Managed device lookup by hardware triple and removal
//! - Multi-cloud support (Commercial, US Government, China, custom endpoints)
//!
//! # Example
//!
//! ```no_run
//! use enrollsync_connector::IdentityDirectory;
//! use enrollsync_connector_entra::{EntraConfig, EntraCredentials, GraphClient, IntuneDirectory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EntraConfig::builder()
//!     .tenant_id("your-tenant-id")
//!     .build()?;
//!
//! let credentials = EntraCredentials::new("your-client-id", "your-client-secret");
//! let client = GraphClient::new(&config, credentials)?;
//!
//! let directory = IntuneDirectory::new(client);
//! let present = directory.exists("imported-identity-id").await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
mod directory;
mod error;
mod graph_client;
mod inventory;

// Re-exports
pub use auth::TokenCache;
pub use config::{
    EntraCloudEnvironment, EntraConfig, EntraConfigBuilder, EntraCredentials,
    DEFAULT_API_VERSION,
};
pub use directory::IntuneDirectory;
pub use error::{EntraError, EntraResult};
pub use graph_client::{GraphClient, ODataError, ODataErrorBody, ODataResponse};
pub use inventory::IntuneInventory;
