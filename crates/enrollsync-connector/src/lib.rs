//! # Collaborator Framework
//!
//! Abstractions over the systems the reconciler keeps consistent.
//!
//! ## Architecture
//!
//! - [`DeviceRegistry`] - Authoritative document store of device records
//! - [`TagPolicyStore`] - Per-tag sync policy
//! - [`IdentityDirectory`] - Trusted hardware identifiers used for automatic enrollment
//! - [`DeviceInventory`] - Managed (already enrolled) devices
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Collaborator traits
//! - [`query`] - Registry query predicate
//! - [`types`] - Records returned by the external systems
//! - [`memory`] - In-memory registry and tag store

pub mod error;
pub mod memory;
pub mod query;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::memory::{InMemoryRegistry, InMemoryTagStore};
    pub use crate::query::DeviceQuery;
    pub use crate::traits::{DeviceInventory, DeviceRegistry, IdentityDirectory, TagPolicyStore};
    pub use crate::types::{DirectoryRecord, ManagedDevice};
}

pub use error::{ConnectorError, ConnectorResult};
pub use query::DeviceQuery;
pub use traits::{DeviceInventory, DeviceRegistry, IdentityDirectory, TagPolicyStore};
pub use types::{DirectoryRecord, ManagedDevice};

// Re-export async_trait for collaborator implementors
pub use async_trait::async_trait;
