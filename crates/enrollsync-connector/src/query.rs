//! Registry query predicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use enrollsync_core::{Device, DeviceStatus};

/// Predicate over device status and last-sync time.
///
/// A query for [`DeviceStatus::Added`] also matches records that carry no
/// status at all; stores that allow a missing status must honor this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceQuery {
    /// Accepted statuses. Empty matches nothing.
    pub statuses: Vec<DeviceStatus>,
    /// Only devices never synced or last synced strictly before this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_before: Option<DateTime<Utc>>,
    /// Maximum number of devices returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl DeviceQuery {
    /// Devices in any of the given statuses.
    #[must_use]
    pub fn with_statuses(statuses: impl IntoIterator<Item = DeviceStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn synced_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.synced_before = Some(cutoff);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether the query selects records with no stored status.
    #[must_use]
    pub fn includes_unset_status(&self) -> bool {
        self.statuses.contains(&DeviceStatus::Added)
    }

    /// Evaluate the predicate against a device.
    #[must_use]
    pub fn matches(&self, device: &Device) -> bool {
        if !self.statuses.contains(&device.status) {
            return false;
        }
        match (self.synced_before, device.last_sync_at) {
            (Some(cutoff), Some(last_sync)) => last_sync < cutoff,
            _ => true,
        }
    }
}
