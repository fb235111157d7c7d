//! Test fakes for the reconciler collaborators.
//!
//! Every fake writes to a shared [`CallLog`] so tests can assert on the
//! order of external calls across collaborators.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use enrollsync_connector::memory::{InMemoryRegistry, InMemoryTagStore};
use enrollsync_connector::{
    ConnectorError, ConnectorResult, DeviceInventory, DeviceQuery, DeviceRegistry,
    DirectoryRecord, IdentityDirectory, ManagedDevice, TagPolicyStore,
};
use enrollsync_core::{
    CanonicalIdentifier, Device, DeviceId, DeviceStatus, HardwareTriple, Tag, TagId,
};
use enrollsync_reconciler::{Reconciler, SyncSettings};

static INIT: Once = Once::new();

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

fn unavailable(what: &str) -> ConnectorError {
    ConnectorError::TargetUnavailable {
        message: format!("{what} unavailable"),
    }
}

/// Ordered record of external calls, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }
}

// ---------------------------------------------------------------------------
// Identity directory
// ---------------------------------------------------------------------------

/// Identity directory keyed by stored value. Adding an existing value
/// returns the existing record.
#[derive(Debug, Default)]
pub struct FakeDirectory {
    log: CallLog,
    records: Mutex<HashMap<String, DirectoryRecord>>,
    next_id: AtomicUsize,
    /// Store values upper-cased, the way a normalizing directory would.
    pub uppercase_values: AtomicBool,
    pub fail_add: AtomicBool,
    pub fail_exists: AtomicBool,
    pub fail_delete: AtomicBool,
    pub delete_refused: AtomicBool,
}

impl FakeDirectory {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Pre-register an identifier under a known id.
    pub fn seed(&self, id: &str, identifier: &CanonicalIdentifier) {
        self.records.lock().unwrap().insert(
            identifier.value.clone(),
            DirectoryRecord {
                id: id.to_string(),
                value: identifier.value.clone(),
                identifier_type: identifier.identifier_type,
            },
        );
    }

    /// Drop a record behind the registry's back.
    pub fn forget(&self, id: &str) {
        self.records.lock().unwrap().retain(|_, r| r.id != id);
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.records.lock().unwrap().values().any(|r| r.id == id)
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.records.lock().unwrap().contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl IdentityDirectory for FakeDirectory {
    async fn add_identifier(
        &self,
        identifier: &CanonicalIdentifier,
    ) -> ConnectorResult<DirectoryRecord> {
        self.log.push(format!("directory.add:{}", identifier.value));
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(unavailable("directory"));
        }

        let value = if self.uppercase_values.load(Ordering::SeqCst) {
            identifier.value.to_uppercase()
        } else {
            identifier.value.clone()
        };

        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(&value) {
            return Ok(existing.clone());
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = DirectoryRecord {
            id: format!("dir-{n}"),
            value: value.clone(),
            identifier_type: identifier.identifier_type,
        };
        records.insert(value, record.clone());
        Ok(record)
    }

    async fn exists(&self, id: &str) -> ConnectorResult<bool> {
        self.log.push(format!("directory.exists:{id}"));
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(unavailable("directory"));
        }
        Ok(self.contains_id(id))
    }

    async fn delete_identifier(&self, id: &str) -> ConnectorResult<bool> {
        self.log.push(format!("directory.delete:{id}"));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable("directory"));
        }
        if self.delete_refused.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.forget(id);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Device inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FakeInventory {
    log: CallLog,
    devices: Mutex<Vec<ManagedDevice>>,
    pub fail_find: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FakeInventory {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Add a managed device matching the given registry device.
    pub fn enroll(&self, id: &str, device: &Device) {
        self.devices.lock().unwrap().push(ManagedDevice {
            id: id.to_string(),
            make: device.make.clone(),
            model: device.model.clone(),
            serial_number: device.serial_number.clone(),
        });
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.lock().unwrap().iter().any(|d| d.id == id)
    }

    pub fn find_by_serial(&self, serial: &str) -> Option<ManagedDevice> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.serial_number == serial)
            .cloned()
    }
}

#[async_trait]
impl DeviceInventory for FakeInventory {
    async fn find_managed_device(
        &self,
        triple: &HardwareTriple<'_>,
    ) -> ConnectorResult<Option<ManagedDevice>> {
        self.log.push(format!("inventory.find:{}", triple.serial_number));
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(unavailable("inventory"));
        }
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.matches(triple))
            .cloned())
    }

    async fn delete_managed_device(&self, id: &str) -> ConnectorResult<bool> {
        self.log.push(format!("inventory.delete:{id}"));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable("inventory"));
        }
        self.devices.lock().unwrap().retain(|d| d.id != id);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Registry and tags
// ---------------------------------------------------------------------------

/// In-memory registry with switchable failures.
#[derive(Debug, Default)]
pub struct FlakyRegistry {
    log: CallLog,
    pub inner: InMemoryRegistry,
    pub fail_query: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub fail_delete: AtomicBool,
    pub upserts: AtomicUsize,
    /// Limit of every query received, in order.
    pub limits: Mutex<Vec<Option<usize>>>,
}

impl FlakyRegistry {
    pub fn new(log: CallLog, devices: impl IntoIterator<Item = Device>) -> Self {
        Self {
            log,
            inner: InMemoryRegistry::with_devices(devices),
            ..Self::default()
        }
    }

    pub async fn get(&self, id: DeviceId) -> Option<Device> {
        self.inner.get(id).await
    }
}

#[async_trait]
impl DeviceRegistry for FlakyRegistry {
    async fn query(&self, query: &DeviceQuery) -> ConnectorResult<Vec<Device>> {
        self.limits.lock().unwrap().push(query.limit);
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(ConnectorError::store_unavailable("query timed out"));
        }
        self.inner.query(query).await
    }

    async fn upsert(&self, device: &Device) -> ConnectorResult<()> {
        self.log.push(format!("registry.upsert:{}", device.id));
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(ConnectorError::store_unavailable("write timed out"));
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(device).await
    }

    async fn delete(&self, id: DeviceId, partition_key: &str) -> ConnectorResult<()> {
        self.log.push(format!("registry.delete:{id}"));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ConnectorError::store_unavailable("delete timed out"));
        }
        self.inner.delete(id, partition_key).await
    }
}

/// In-memory tag store with a switchable failure.
#[derive(Debug, Default)]
pub struct FlakyTagStore {
    pub inner: InMemoryTagStore,
    pub fail: AtomicBool,
}

#[async_trait]
impl TagPolicyStore for FlakyTagStore {
    async fn is_sync_enabled(&self, tag_id: TagId) -> ConnectorResult<bool> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConnectorError::store_unavailable("tags unavailable"));
        }
        self.inner.is_sync_enabled(tag_id).await
    }

    async fn list_sync_enabled_tag_ids(&self) -> ConnectorResult<HashSet<TagId>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConnectorError::store_unavailable("tags unavailable"));
        }
        self.inner.list_sync_enabled_tag_ids().await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A reconciler wired to fakes, with handles on every fake.
pub struct Harness {
    pub log: CallLog,
    pub registry: Arc<FlakyRegistry>,
    pub tags: Arc<FlakyTagStore>,
    pub directory: Arc<FakeDirectory>,
    pub inventory: Arc<FakeInventory>,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new(devices: Vec<Device>, tags: Vec<Tag>, settings: SyncSettings) -> Self {
        init_test_logging();
        let log = CallLog::default();
        let registry = Arc::new(FlakyRegistry::new(log.clone(), devices));
        let tags = Arc::new(FlakyTagStore {
            inner: InMemoryTagStore::with_tags(tags),
            ..FlakyTagStore::default()
        });
        let directory = Arc::new(FakeDirectory::new(log.clone()));
        let inventory = Arc::new(FakeInventory::new(log.clone()));
        let reconciler = Arc::new(Reconciler::new(
            registry.clone(),
            tags.clone(),
            directory.clone(),
            inventory.clone(),
            settings,
        ));
        Self {
            log,
            registry,
            tags,
            directory,
            inventory,
            reconciler,
        }
    }

    pub async fn device(&self, id: DeviceId) -> Option<Device> {
        self.registry.get(id).await
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

pub fn latitude() -> Device {
    Device::new("Dell", "Latitude 5420", "ABC123").with_os(enrollsync_core::OsKind::Windows)
}

pub fn macbook() -> Device {
    Device::new("Apple", "MacBook Pro", "C02XYZ").with_os(enrollsync_core::OsKind::MacOs)
}

/// A `Synced` device holding `identifier_id`, last synced `hours_ago`.
pub fn synced(device: Device, identifier_id: &str, hours_ago: i64) -> Device {
    let identifier = device.canonical_identifier().unwrap();
    Device {
        status: DeviceStatus::Synced,
        identifier_id: Some(identifier_id.to_string()),
        identifier_value: Some(identifier.value),
        identifier_type: Some(identifier.identifier_type),
        last_sync_at: Some(Utc::now() - Duration::hours(hours_ago)),
        ..device
    }
}

/// A `NotSyncing` device last synced `hours_ago`.
pub fn not_syncing(device: Device, hours_ago: i64) -> Device {
    Device {
        status: DeviceStatus::NotSyncing,
        last_sync_at: Some(Utc::now() - Duration::hours(hours_ago)),
        ..device
    }
}

/// A device marked for deletion.
pub fn deleting(device: Device, identifier_id: Option<&str>) -> Device {
    Device {
        status: DeviceStatus::Deleting,
        identifier_id: identifier_id.map(str::to_string),
        delete_requested: true,
        ..device
    }
}
