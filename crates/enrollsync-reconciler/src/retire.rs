//! Retire flow: ordered removal of `Deleting` devices.
//!
//! Each device goes through three phases and stops at the first failure:
//!
//! 1. Inventory: remove the managed-device record, if any.
//! 2. Identity: remove the directory identifier, if sync is enabled and one is held.
//! 3. Registry: remove the device record.
//!
//! The registry record goes last so that every live external record stays
//! reachable from a registry record.

use tracing::{debug, info, instrument};

use enrollsync_connector::DeviceQuery;
use enrollsync_core::{Device, DeviceStatus};

use crate::engine::{fail, fail_with, finish, Reconciler};
use crate::error::{ReconcilerError, ReconcilerResult};
use crate::outcome::{DeviceFailure, DeviceOutcome, FailedStep, FlowKind, RunSummary};

const FLOW: FlowKind = FlowKind::Retire;

impl Reconciler {
    /// Retire every `Deleting` device.
    ///
    /// The sync switch only decides whether identifiers are removed from the
    /// directory. Inventory cleanup always runs.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcilerError::RegistryRead`] if the registry cannot be queried.
    #[instrument(skip(self))]
    pub async fn run_retire(&self) -> ReconcilerResult<RunSummary> {
        let mut summary = RunSummary::start(FLOW);
        let identity_cleanup = self.settings.is_sync_enabled();

        let query = DeviceQuery::with_statuses([DeviceStatus::Deleting]);
        let devices = self
            .registry
            .query(&query)
            .await
            .map_err(ReconcilerError::RegistryRead)?;
        debug!(count = devices.len(), identity_cleanup, "Devices pending retirement");

        for device in devices {
            let outcome = self.retire_device(&device, identity_cleanup).await;
            summary.record(&outcome);
        }

        Ok(finish(summary))
    }

    async fn retire_device(&self, device: &Device, identity_cleanup: bool) -> DeviceOutcome {
        if let Err(outcome) = self.remove_from_inventory(device).await {
            return outcome;
        }

        if identity_cleanup {
            if let Err(outcome) = self.remove_from_directory(device).await {
                return outcome;
            }
        }

        if let Err(e) = self
            .registry
            .delete(device.id, &device.partition_key())
            .await
        {
            return fail_with(FLOW, device, FailedStep::RegistryDelete, &e);
        }

        info!(
            device_id = %device.id,
            serial = %device.serial_number,
            "Device retired"
        );
        DeviceOutcome::Committed
    }

    async fn remove_from_inventory(&self, device: &Device) -> Result<(), DeviceOutcome> {
        let managed = self
            .inventory
            .find_managed_device(&device.hardware())
            .await
            .map_err(|e| fail_with(FLOW, device, FailedStep::InventoryLookup, &e))?;

        let Some(managed) = managed else {
            debug!(device_id = %device.id, "No managed device found");
            return Ok(());
        };

        match self.inventory.delete_managed_device(&managed.id).await {
            Ok(true) => {
                debug!(
                    device_id = %device.id,
                    managed_device_id = %managed.id,
                    "Managed device removed"
                );
                Ok(())
            }
            Ok(false) => Err(fail(
                FLOW,
                device,
                DeviceFailure::not_removed(FailedStep::InventoryDelete, &managed.id),
            )),
            Err(e) => Err(fail_with(FLOW, device, FailedStep::InventoryDelete, &e)),
        }
    }

    async fn remove_from_directory(&self, device: &Device) -> Result<(), DeviceOutcome> {
        let Some(id) = device.held_identifier_id() else {
            return Ok(());
        };

        match self.directory.delete_identifier(id).await {
            Ok(true) => {
                debug!(device_id = %device.id, identifier_id = %id, "Identifier removed");
                Ok(())
            }
            Ok(false) => Err(fail(
                FLOW,
                device,
                DeviceFailure::not_removed(FailedStep::DirectoryDelete, id),
            )),
            Err(e) => Err(fail_with(FLOW, device, FailedStep::DirectoryDelete, &e)),
        }
    }
}
