//! Collaborator traits
//!
//! The reconciler talks to four collaborators, each behind its own trait so
//! the storage engine and the external clients can be swapped independently.

use async_trait::async_trait;
use std::collections::HashSet;

use enrollsync_core::{CanonicalIdentifier, Device, DeviceId, HardwareTriple, TagId};

use crate::error::ConnectorResult;
use crate::query::DeviceQuery;
use crate::types::{DirectoryRecord, ManagedDevice};

/// Document store holding the device records.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Return all devices matching the predicate.
    async fn query(&self, query: &DeviceQuery) -> ConnectorResult<Vec<Device>>;

    /// Insert or replace a device record.
    ///
    /// Transient store failures surface as
    /// [`ConnectorError::StoreUnavailable`](crate::error::ConnectorError::StoreUnavailable);
    /// implementations do not retry internally.
    async fn upsert(&self, device: &Device) -> ConnectorResult<()>;

    /// Remove a device record. Deleting a missing record is not an error.
    async fn delete(&self, id: DeviceId, partition_key: &str) -> ConnectorResult<()>;
}

/// Per-tag sync policy.
#[async_trait]
pub trait TagPolicyStore: Send + Sync {
    /// Whether devices with this tag are synced. Unknown tags are not.
    async fn is_sync_enabled(&self, tag_id: TagId) -> ConnectorResult<bool>;

    /// Ids of every tag with sync enabled.
    async fn list_sync_enabled_tag_ids(&self) -> ConnectorResult<HashSet<TagId>>;
}

/// Directory of trusted hardware identifiers used for automatic enrollment.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Register an identifier.
    ///
    /// Idempotent: registering a value that is already present returns the
    /// existing record.
    async fn add_identifier(
        &self,
        identifier: &CanonicalIdentifier,
    ) -> ConnectorResult<DirectoryRecord>;

    /// Whether a record with this id exists. Not found is `Ok(false)`.
    async fn exists(&self, id: &str) -> ConnectorResult<bool>;

    /// Remove a record. A missing record counts as removed.
    async fn delete_identifier(&self, id: &str) -> ConnectorResult<bool>;
}

/// Inventory of managed (already enrolled) devices.
#[async_trait]
pub trait DeviceInventory: Send + Sync {
    /// Find the managed device exactly matching the hardware triple.
    async fn find_managed_device(
        &self,
        triple: &HardwareTriple<'_>,
    ) -> ConnectorResult<Option<ManagedDevice>>;

    /// Remove a managed-device record.
    async fn delete_managed_device(&self, id: &str) -> ConnectorResult<bool>;
}
