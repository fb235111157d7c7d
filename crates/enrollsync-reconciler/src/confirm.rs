//! Confirm flow: re-check settled devices against the tag policy and the
//! identity directory, correcting drift.

use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use enrollsync_connector::DeviceQuery;
use enrollsync_core::{Device, DeviceStatus, IdentifierError, TagId};

use crate::engine::{fail, fail_with, finish, Reconciler};
use crate::error::{ReconcilerError, ReconcilerResult};
use crate::outcome::{DeviceFailure, DeviceOutcome, FailedStep, FlowKind, RunSummary, SkipReason};

const FLOW: FlowKind = FlowKind::Confirm;

impl Reconciler {
    /// Confirm `Synced` and `NotSyncing` devices whose last sync is older
    /// than the confirm interval.
    ///
    /// Only devices that end in a consistent state get a new sync timestamp.
    ///
    /// # Errors
    ///
    /// - [`ReconcilerError::InvalidConfiguration`] if the confirm interval is
    ///   missing or invalid; no device is read.
    /// - [`ReconcilerError::TagPolicy`] if the enabled tags cannot be listed.
    /// - [`ReconcilerError::RegistryRead`] if the registry cannot be queried.
    #[instrument(skip(self))]
    pub async fn run_confirm(&self) -> ReconcilerResult<RunSummary> {
        let mut summary = RunSummary::start(FLOW);

        if !self.settings.is_sync_enabled() {
            debug!("Sync disabled, skipping confirm run");
            return Ok(summary.disabled());
        }

        let cutoff = self.settings.confirm_cutoff(Utc::now())?;

        let enabled_tags = self
            .tags
            .list_sync_enabled_tag_ids()
            .await
            .map_err(ReconcilerError::TagPolicy)?;

        let query = DeviceQuery::with_statuses([DeviceStatus::Synced, DeviceStatus::NotSyncing])
            .synced_before(cutoff);
        let devices = self
            .registry
            .query(&query)
            .await
            .map_err(ReconcilerError::RegistryRead)?;
        debug!(
            count = devices.len(),
            enabled_tags = enabled_tags.len(),
            cutoff = %cutoff,
            "Devices due for confirmation"
        );

        for device in devices {
            let outcome = self.confirm_device(device, &enabled_tags).await;
            summary.record(&outcome);
        }

        Ok(finish(summary))
    }

    async fn confirm_device(
        &self,
        mut device: Device,
        enabled_tags: &HashSet<TagId>,
    ) -> DeviceOutcome {
        // Untagged devices are treated as sync-disabled.
        let tag_enabled = device
            .tag_id
            .is_some_and(|tag_id| enabled_tags.contains(&tag_id));

        let settled = if tag_enabled {
            self.confirm_registered(&mut device).await
        } else {
            self.confirm_unregistered(&mut device).await
        };

        match settled {
            Ok(()) => self.commit(FLOW, &device).await,
            Err(outcome) => outcome,
        }
    }

    /// Tag enabled: the directory must hold the device's identifier.
    async fn confirm_registered(&self, device: &mut Device) -> Result<(), DeviceOutcome> {
        let mut registered_id = None;

        if let Some(id) = device.held_identifier_id().map(str::to_string) {
            match self.directory.exists(&id).await {
                Ok(true) if device.status == DeviceStatus::Synced => {
                    device.touch(Utc::now());
                    return Ok(());
                }
                Ok(true) => registered_id = Some(id),
                Ok(false) => {
                    info!(
                        device_id = %device.id,
                        identifier_id = %id,
                        "Identifier missing from directory, re-registering"
                    );
                }
                Err(e) => return Err(fail_with(FLOW, device, FailedStep::DirectoryExists, &e)),
            }
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
                return Err(DeviceOutcome::skipped(SkipReason::UnsupportedOs(os)));
            }
            Err(e) => {
                return Err(fail(
                    FLOW,
                    device,
                    DeviceFailure {
                        step: FailedStep::DirectoryAdd,
                        message: e.to_string(),
                        transient: false,
                    },
                ))
            }
        };

        let (id, identifier) = match registered_id {
            Some(id) => (id, identifier),
            None => self
                .directory
                .add_identifier(&identifier)
                .await
                .map_err(|e| fail_with(FLOW, device, FailedStep::DirectoryAdd, &e))?
                .into_parts(),
        };

        device
            .mark_synced(id, identifier, Utc::now())
            .map_err(|e| fail(FLOW, device, DeviceFailure::from_transition(&e)))
    }

    /// Tag disabled or missing: the directory must not hold the identifier.
    async fn confirm_unregistered(&self, device: &mut Device) -> Result<(), DeviceOutcome> {
        if device.status == DeviceStatus::NotSyncing && device.held_identifier_id().is_none() {
            device.touch(Utc::now());
            return Ok(());
        }

        if let Some(id) = device.held_identifier_id().map(str::to_string) {
            match self.directory.delete_identifier(&id).await {
                Ok(true) => {
                    info!(
                        device_id = %device.id,
                        identifier_id = %id,
                        "Removed identifier of device no longer synced"
                    );
                }
                Ok(false) => {
                    return Err(fail(
                        FLOW,
                        device,
                        DeviceFailure::not_removed(FailedStep::DirectoryDelete, &id),
                    ))
                }
                Err(e) => return Err(fail_with(FLOW, device, FailedStep::DirectoryDelete, &e)),
            }
        }

        device
            .mark_not_syncing(Utc::now())
            .map_err(|e| fail(FLOW, device, DeviceFailure::from_transition(&e)))
    }
}
