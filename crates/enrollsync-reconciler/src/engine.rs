//! Reconciler orchestrator.
//!
//! Holds the collaborators and dispatches flow runs. The flows themselves
//! live in `enroll`, `confirm` and `retire`.

use std::sync::Arc;
use tracing::{info, warn};

use enrollsync_connector::{
    ConnectorError, DeviceInventory, DeviceRegistry, IdentityDirectory, TagPolicyStore,
};
use enrollsync_core::Device;

use crate::error::ReconcilerResult;
use crate::outcome::{DeviceFailure, DeviceOutcome, FailedStep, FlowKind, RunSummary};
use crate::settings::SyncSettings;

/// Keeps the device registry consistent with the identity directory and the
/// device inventory.
///
/// ```text
///  ┌───────────────┐   ┌─────────────────┐   ┌─────────────────┐
///  │  run_enroll   │   │   run_confirm   │   │   run_retire    │
///  │  Added ─► ... │   │ Synced/NotSync. │   │    Deleting     │
///  └──────┬────────┘   └────────┬────────┘   └────────┬────────┘
///         │                     │                     │
///         ▼                     ▼                     ▼
///  TagPolicyStore ── IdentityDirectory ── DeviceInventory ── DeviceRegistry
/// ```
///
/// Every device is handled on its own: external calls first, then a single
/// registry write. A failure leaves the device as it was so the next run
/// picks it up again.
pub struct Reconciler {
    pub(crate) registry: Arc<dyn DeviceRegistry>,
    pub(crate) tags: Arc<dyn TagPolicyStore>,
    pub(crate) directory: Arc<dyn IdentityDirectory>,
    pub(crate) inventory: Arc<dyn DeviceInventory>,
    pub(crate) settings: SyncSettings,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        tags: Arc<dyn TagPolicyStore>,
        directory: Arc<dyn IdentityDirectory>,
        inventory: Arc<dyn DeviceInventory>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            registry,
            tags,
            directory,
            inventory,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run one pass of the given flow.
    ///
    /// # Errors
    ///
    /// Returns a [`ReconcilerError`](crate::ReconcilerError) only when the
    /// whole run had to be aborted.
    pub async fn run(&self, flow: FlowKind) -> ReconcilerResult<RunSummary> {
        match flow {
            FlowKind::Enroll => self.run_enroll().await,
            FlowKind::Confirm => self.run_confirm().await,
            FlowKind::Retire => self.run_retire().await,
        }
    }

    /// Write a device back to the registry.
    pub(crate) async fn commit(&self, flow: FlowKind, device: &Device) -> DeviceOutcome {
        match self.registry.upsert(device).await {
            Ok(()) => DeviceOutcome::Committed,
            Err(e) => fail(
                flow,
                device,
                DeviceFailure::from_connector(FailedStep::RegistryWrite, &e),
            ),
        }
    }
}

/// Log a per-device failure with the device identity and turn it into an outcome.
pub(crate) fn fail(flow: FlowKind, device: &Device, failure: DeviceFailure) -> DeviceOutcome {
    warn!(
        flow = %flow,
        device_id = %device.id,
        make = %device.make,
        model = %device.model,
        serial = %device.serial_number,
        step = %failure.step,
        transient = failure.transient,
        error = %failure.message,
        "Device reconciliation failed"
    );
    DeviceOutcome::failed(failure)
}

/// Shorthand for a connector error at a given step.
pub(crate) fn fail_with(
    flow: FlowKind,
    device: &Device,
    step: FailedStep,
    error: &ConnectorError,
) -> DeviceOutcome {
    fail(flow, device, DeviceFailure::from_connector(step, error))
}

/// Close the summary and log it.
pub(crate) fn finish(summary: RunSummary) -> RunSummary {
    let summary = summary.complete();
    info!(
        flow = %summary.flow,
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        transient_failures = summary.transient_failures,
        duration_ms = summary.duration_ms().unwrap_or_default(),
        "Flow run completed"
    );
    summary
}
