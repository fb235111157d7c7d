//! Per-device outcomes and run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use enrollsync_connector::ConnectorError;
use enrollsync_core::TransitionError;

/// The three reconciliation flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Enroll,
    Confirm,
    Retire,
}

impl FlowKind {
    pub const ALL: [FlowKind; 3] = [FlowKind::Enroll, FlowKind::Confirm, FlowKind::Retire];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Enroll => "enroll",
            FlowKind::Confirm => "confirm",
            FlowKind::Retire => "retire",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a device was left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The device has no tag and cannot be enrolled.
    NoTag,
    /// The device OS has no identifier rule.
    UnsupportedOs(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoTag => write!(f, "no tag"),
            SkipReason::UnsupportedOs(os) => write!(f, "unsupported OS '{os}'"),
        }
    }
}

/// Step at which a device failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStep {
    TagLookup,
    DirectoryAdd,
    DirectoryExists,
    DirectoryDelete,
    InventoryLookup,
    InventoryDelete,
    RegistryWrite,
    RegistryDelete,
    StatusTransition,
}

impl FailedStep {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FailedStep::TagLookup => "tag_lookup",
            FailedStep::DirectoryAdd => "directory_add",
            FailedStep::DirectoryExists => "directory_exists",
            FailedStep::DirectoryDelete => "directory_delete",
            FailedStep::InventoryLookup => "inventory_lookup",
            FailedStep::InventoryDelete => "inventory_delete",
            FailedStep::RegistryWrite => "registry_write",
            FailedStep::RegistryDelete => "registry_delete",
            FailedStep::StatusTransition => "status_transition",
        }
    }
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A per-device failure. The device keeps its previous state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFailure {
    pub step: FailedStep,
    pub message: String,
    /// Expected to clear up by the next cycle.
    pub transient: bool,
}

impl DeviceFailure {
    #[must_use]
    pub fn from_connector(step: FailedStep, error: &ConnectorError) -> Self {
        Self {
            step,
            message: error.to_string(),
            transient: error.is_transient(),
        }
    }

    /// An external call reported that it did not remove the record.
    #[must_use]
    pub fn not_removed(step: FailedStep, id: &str) -> Self {
        Self {
            step,
            message: format!("record {id} was not removed"),
            transient: false,
        }
    }

    #[must_use]
    pub fn from_transition(error: &TransitionError) -> Self {
        Self {
            step: FailedStep::StatusTransition,
            message: error.to_string(),
            transient: false,
        }
    }
}

impl fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Result of reconciling one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// The device reached its target state and it was committed to the registry
    /// (or, for retire, the record was removed).
    Committed,
    Skipped { reason: SkipReason },
    Failed { failure: DeviceFailure },
}

impl DeviceOutcome {
    #[must_use]
    pub fn skipped(reason: SkipReason) -> Self {
        DeviceOutcome::Skipped { reason }
    }

    #[must_use]
    pub fn failed(failure: DeviceFailure) -> Self {
        DeviceOutcome::Failed { failure }
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, DeviceOutcome::Committed)
    }
}

/// Counts for one flow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub flow: FlowKind,
    /// Devices committed (enroll, confirm) or fully retired (retire).
    pub processed: u32,
    pub skipped: u32,
    pub failed: u32,
    /// Failures expected to clear up on a later cycle.
    pub transient_failures: u32,
    /// The run was a no-op because sync is disabled.
    pub sync_disabled: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    #[must_use]
    pub fn start(flow: FlowKind) -> Self {
        Self {
            flow,
            processed: 0,
            skipped: 0,
            failed: 0,
            transient_failures: 0,
            sync_disabled: false,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Count a device outcome.
    pub fn record(&mut self, outcome: &DeviceOutcome) {
        match outcome {
            DeviceOutcome::Committed => self.processed += 1,
            DeviceOutcome::Skipped { .. } => self.skipped += 1,
            DeviceOutcome::Failed { failure } => {
                self.failed += 1;
                if failure.transient {
                    self.transient_failures += 1;
                }
            }
        }
    }

    /// Devices examined in this run.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.processed + self.skipped + self.failed
    }

    /// Mark the run complete.
    #[must_use]
    pub fn complete(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }

    /// Mark the run as a no-op because sync is disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.sync_disabled = true;
        self.complete()
    }

    /// Duration in milliseconds, once complete.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
