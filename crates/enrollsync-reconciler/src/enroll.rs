//! Enroll flow: register newly added devices with the identity directory.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use enrollsync_connector::DeviceQuery;
use enrollsync_core::{Device, DeviceStatus, IdentifierError};

use crate::engine::{fail, fail_with, finish, Reconciler};
use crate::error::{ReconcilerError, ReconcilerResult};
use crate::outcome::{DeviceFailure, DeviceOutcome, FailedStep, FlowKind, RunSummary, SkipReason};

/// Maximum number of `Added` devices picked up by one enroll run.
pub const ENROLL_BATCH_LIMIT: usize = 10_000;

const FLOW: FlowKind = FlowKind::Enroll;

impl Reconciler {
    /// Move `Added` devices to `Synced` or `NotSyncing`.
    ///
    /// A disabled or misconfigured sync switch makes this a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcilerError::RegistryRead`] if the registry cannot be queried.
    #[instrument(skip(self))]
    pub async fn run_enroll(&self) -> ReconcilerResult<RunSummary> {
        let mut summary = RunSummary::start(FLOW);

        if !self.settings.is_sync_enabled() {
            debug!("Sync disabled, skipping enroll run");
            return Ok(summary.disabled());
        }

        let query = DeviceQuery::with_statuses([DeviceStatus::Added]).limit(ENROLL_BATCH_LIMIT);
        let devices = self
            .registry
            .query(&query)
            .await
            .map_err(ReconcilerError::RegistryRead)?;
        debug!(count = devices.len(), "Devices pending enrollment");

        for device in devices {
            let outcome = self.enroll_device(device).await;
            summary.record(&outcome);
        }

        Ok(finish(summary))
    }

    async fn enroll_device(&self, mut device: Device) -> DeviceOutcome {
        let Some(tag_id) = device.tag_id else {
            info!(
                device_id = %device.id,
                serial = %device.serial_number,
                "Device has no tag, leaving it for later"
            );
            return DeviceOutcome::skipped(SkipReason::NoTag);
        };

        let sync_enabled = match self.tags.is_sync_enabled(tag_id).await {
            Ok(enabled) => enabled,
            Err(e) => return fail_with(FLOW, &device, FailedStep::TagLookup, &e),
        };

        if !sync_enabled {
            if let Err(e) = device.mark_not_syncing(Utc::now()) {
                return fail(FLOW, &device, DeviceFailure::from_transition(&e));
            }
            debug!(device_id = %device.id, tag_id = %tag_id, "Tag not synced, marking NotSyncing");
            return self.commit(FLOW, &device).await;
        }

        let identifier = match device.canonical_identifier() {
            Ok(identifier) => identifier,
            Err(IdentifierError::UnsupportedOsKind(os)) => {
                warn!(
                    device_id = %device.id,
                    serial = %device.serial_number,
                    os = %os,
                    "Unsupported OS, device skipped"
                );
                return DeviceOutcome::skipped(SkipReason::UnsupportedOs(os));
            }
            Err(e) => {
                return fail(
                    FLOW,
                    &device,
                    DeviceFailure {
                        step: FailedStep::DirectoryAdd,
                        message: e.to_string(),
                        transient: false,
                    },
                )
            }
        };

        let (identifier_id, registered) = match self.directory.add_identifier(&identifier).await {
            Ok(record) => record.into_parts(),
            Err(e) => return fail_with(FLOW, &device, FailedStep::DirectoryAdd, &e),
        };
        if registered.value != identifier.value {
            debug!(
                device_id = %device.id,
                submitted = %identifier.value,
                stored = %registered.value,
                "Directory normalized the identifier value"
            );
        }

        // Persist the value as the directory holds it.
        if let Err(e) = device.mark_synced(identifier_id, registered, Utc::now()) {
            return fail(FLOW, &device, DeviceFailure::from_transition(&e));
        }
        debug!(
            device_id = %device.id,
            identifier_id = ?device.identifier_id,
            "Device registered with identity directory"
        );
        self.commit(FLOW, &device).await
    }
}
