//! Device records and the status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::identifier::{CanonicalIdentifier, IdentifierType};
use crate::ids::{DeviceId, TagId};

/// Enrollment status of a device record.
///
/// ```text
///   Added ──► Synced ◄──► NotSyncing
///     │          │            │
///     └──────────┼──► NotSyncing
///                ▼            ▼
///             Deleting ◄──────┘   (external trigger, then record removed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceStatus {
    /// Newly created, not yet processed by the enroll flow.
    #[default]
    Added,
    /// Identifier registered with the identity directory.
    Synced,
    /// Tag has sync disabled, nothing registered with the directory.
    NotSyncing,
    /// Removal requested; retire flow cleans up external systems.
    Deleting,
}

impl DeviceStatus {
    /// Get the string representation used in the registry.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Added => "Added",
            DeviceStatus::Synced => "Synced",
            DeviceStatus::NotSyncing => "NotSyncing",
            DeviceStatus::Deleting => "Deleting",
        }
    }

    /// Whether a device may move from `self` to `next`.
    ///
    /// Self-loops on `Synced` and `NotSyncing` are allowed because the
    /// confirm flow re-persists devices whose state is unchanged.
    #[must_use]
    pub fn can_transition_to(&self, next: DeviceStatus) -> bool {
        use DeviceStatus::{Added, Deleting, NotSyncing, Synced};
        matches!(
            (self, next),
            (Added, Synced | NotSyncing)
                | (Synced | NotSyncing, Synced | NotSyncing)
                | (Synced | NotSyncing, Deleting)
        )
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = ParseDeviceStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "added" => Ok(DeviceStatus::Added),
            "synced" => Ok(DeviceStatus::Synced),
            "notsyncing" | "not_syncing" => Ok(DeviceStatus::NotSyncing),
            "deleting" => Ok(DeviceStatus::Deleting),
            _ => Err(ParseDeviceStatusError(s.to_string())),
        }
    }
}

/// Error parsing device status from string.
#[derive(Debug, Clone, Error)]
#[error("invalid device status '{0}', expected one of: Added, Synced, NotSyncing, Deleting")]
pub struct ParseDeviceStatusError(String);

/// Operating system reported for a device.
///
/// Values the identifier policy does not know are kept verbatim in
/// `Unsupported` so they can be logged and skipped rather than coerced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum OsKind {
    Windows,
    MacOs,
    Ios,
    Android,
    #[default]
    Unknown,
    Unsupported(String),
}

impl OsKind {
    /// Get the string representation used in the registry.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            OsKind::Windows => "Windows",
            OsKind::MacOs => "MacOS",
            OsKind::Ios => "iOS",
            OsKind::Android => "Android",
            OsKind::Unknown => "Unknown",
            OsKind::Unsupported(raw) => raw,
        }
    }

    /// Parse a stored value. Empty or missing values map to `Unknown`.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return OsKind::Unknown;
        };
        match raw.to_lowercase().as_str() {
            "windows" => OsKind::Windows,
            "macos" => OsKind::MacOs,
            "ios" => OsKind::Ios,
            "android" => OsKind::Android,
            "unknown" => OsKind::Unknown,
            _ => OsKind::Unsupported(raw.to_string()),
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for OsKind {
    fn from(value: String) -> Self {
        OsKind::parse(Some(&value))
    }
}

impl From<OsKind> for String {
    fn from(value: OsKind) -> Self {
        value.as_str().to_string()
    }
}

/// Make, model and serial number of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareTriple<'a> {
    pub make: &'a str,
    pub model: &'a str,
    pub serial_number: &'a str,
}

impl fmt::Display for HardwareTriple<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.make, self.model, self.serial_number)
    }
}

/// A rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("device {device_id}: transition {from} -> {to} is not allowed")]
    NotAllowed {
        device_id: DeviceId,
        from: DeviceStatus,
        to: DeviceStatus,
    },

    #[error("device {device_id}: deletion has not been requested")]
    DeletionNotRequested { device_id: DeviceId },
}

/// A device record in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub make: String,
    pub model: String,
    pub serial_number: String,
    #[serde(default)]
    pub os: OsKind,
    #[serde(default)]
    pub tag_id: Option<TagId>,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default)]
    pub identifier_id: Option<String>,
    #[serde(default)]
    pub identifier_value: Option<String>,
    #[serde(default)]
    pub identifier_type: Option<IdentifierType>,
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delete_requested: bool,
}

impl Device {
    /// Create a new device in the `Added` state.
    #[must_use]
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        serial_number: impl Into<String>,
    ) -> Self {
        Self {
            id: DeviceId::new(),
            make: make.into(),
            model: model.into(),
            serial_number: serial_number.into(),
            os: OsKind::Unknown,
            tag_id: None,
            status: DeviceStatus::Added,
            identifier_id: None,
            identifier_value: None,
            identifier_type: None,
            last_sync_at: None,
            delete_requested: false,
        }
    }

    #[must_use]
    pub fn with_os(mut self, os: OsKind) -> Self {
        self.os = os;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag_id: TagId) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    #[must_use]
    pub fn hardware(&self) -> HardwareTriple<'_> {
        HardwareTriple {
            make: &self.make,
            model: &self.model,
            serial_number: &self.serial_number,
        }
    }

    /// Key passed to the registry alongside the id on delete.
    #[must_use]
    pub fn partition_key(&self) -> String {
        self.id.to_string()
    }

    /// Returns the directory identifier id if one is held.
    #[must_use]
    pub fn held_identifier_id(&self) -> Option<&str> {
        self.identifier_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Record a directory registration and move to `Synced`.
    pub fn mark_synced(
        &mut self,
        identifier_id: String,
        identifier: CanonicalIdentifier,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.check_transition(DeviceStatus::Synced)?;
        self.identifier_id = Some(identifier_id);
        self.identifier_value = Some(identifier.value);
        self.identifier_type = Some(identifier.identifier_type);
        self.status = DeviceStatus::Synced;
        self.last_sync_at = Some(now);
        Ok(())
    }

    /// Drop any directory registration and move to `NotSyncing`.
    pub fn mark_not_syncing(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check_transition(DeviceStatus::NotSyncing)?;
        self.identifier_id = None;
        self.identifier_value = None;
        self.identifier_type = None;
        self.status = DeviceStatus::NotSyncing;
        self.last_sync_at = Some(now);
        Ok(())
    }

    /// Refresh the sync timestamp of a device whose state is already settled.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_sync_at = Some(now);
    }

    /// Move to `Deleting`. Requires the externally set `delete_requested` flag.
    pub fn begin_deletion(&mut self) -> Result<(), TransitionError> {
        if !self.delete_requested {
            return Err(TransitionError::DeletionNotRequested { device_id: self.id });
        }
        self.check_transition(DeviceStatus::Deleting)?;
        self.status = DeviceStatus::Deleting;
        Ok(())
    }

    fn check_transition(&self, to: DeviceStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransitionError::NotAllowed {
                device_id: self.id,
                from: self.status,
                to,
            })
        }
    }
}
