//! In-memory registry and tag store.
//!
//! Same query semantics as the Postgres store. Used by the reconciler tests
//! and for local runs without a database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use enrollsync_core::{Device, DeviceId, Tag, TagId};

use crate::error::ConnectorResult;
use crate::query::DeviceQuery;
use crate::traits::{DeviceRegistry, TagPolicyStore};

/// Device registry held in a map keyed by device id.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    devices: RwLock<HashMap<DeviceId, Device>>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with devices.
    #[must_use]
    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        Self {
            devices: RwLock::new(devices.into_iter().map(|d| (d.id, d)).collect()),
        }
    }

    pub async fn insert(&self, device: Device) {
        self.devices.write().await.insert(device.id, device);
    }

    pub async fn get(&self, id: DeviceId) -> Option<Device> {
        self.devices.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryRegistry {
    async fn query(&self, query: &DeviceQuery) -> ConnectorResult<Vec<Device>> {
        let devices = self.devices.read().await;
        let mut matched: Vec<Device> = devices
            .values()
            .filter(|d| query.matches(d))
            .cloned()
            .collect();
        // Stable order keeps runs deterministic.
        matched.sort_by_key(|d| d.id);
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn upsert(&self, device: &Device) -> ConnectorResult<()> {
        self.devices.write().await.insert(device.id, device.clone());
        Ok(())
    }

    async fn delete(&self, id: DeviceId, _partition_key: &str) -> ConnectorResult<()> {
        self.devices.write().await.remove(&id);
        Ok(())
    }
}

/// Tag policy store held in a map keyed by tag id.
#[derive(Debug, Default)]
pub struct InMemoryTagStore {
    tags: RwLock<HashMap<TagId, Tag>>,
}

impl InMemoryTagStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            tags: RwLock::new(tags.into_iter().map(|t| (t.id, t)).collect()),
        }
    }

    pub async fn insert(&self, tag: Tag) {
        self.tags.write().await.insert(tag.id, tag);
    }

    /// Flip the sync flag of an existing tag. Returns false if the tag is unknown.
    pub async fn set_sync_enabled(&self, tag_id: TagId, enabled: bool) -> bool {
        match self.tags.write().await.get_mut(&tag_id) {
            Some(tag) => {
                tag.sync_enabled = enabled;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl TagPolicyStore for InMemoryTagStore {
    async fn is_sync_enabled(&self, tag_id: TagId) -> ConnectorResult<bool> {
        Ok(self
            .tags
            .read()
            .await
            .get(&tag_id)
            .is_some_and(|t| t.sync_enabled))
    }

    async fn list_sync_enabled_tag_ids(&self) -> ConnectorResult<HashSet<TagId>> {
        Ok(self
            .tags
            .read()
            .await
            .values()
            .filter(|t| t.sync_enabled)
            .map(|t| t.id)
            .collect())
    }
}
