//! Postgres-backed device registry.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use enrollsync_connector::{ConnectorResult, DeviceQuery, DeviceRegistry};
use enrollsync_core::{Device, DeviceId};

use crate::error::DbError;
use crate::models::DeviceRow;
use crate::pool::DbPool;

/// [`DeviceRegistry`] over the `devices` table.
///
/// Records live in a single table, so the partition key passed to
/// [`DeviceRegistry::delete`] is not needed to address a row.
#[derive(Debug, Clone)]
pub struct PgDeviceRegistry {
    pool: DbPool,
}

impl PgDeviceRegistry {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a single device.
    ///
    /// # Errors
    ///
    /// Returns a `DbError` if the query fails or the row cannot be decoded.
    pub async fn get(&self, id: DeviceId) -> Result<Option<Device>, DbError> {
        DeviceRow::find_by_id(self.pool.inner(), *id.as_uuid())
            .await?
            .map(Device::try_from)
            .transpose()
    }

    /// Flag a device for removal and move it to `Deleting`.
    ///
    /// This is the external trigger the retire flow acts on. Only devices in
    /// `Synced` or `NotSyncing` can be retired.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` for an unknown device and
    /// `DbError::ValidationFailed` if the device is in another state.
    #[instrument(skip(self), fields(device_id = %id))]
    pub async fn request_deletion(&self, id: DeviceId) -> Result<Device, DbError> {
        let mut tx = self.pool.inner().begin().await?;

        let row = DeviceRow::find_by_id_for_update(&mut *tx, *id.as_uuid())
            .await?
            .ok_or_else(|| DbError::NotFound(format!("device {id}")))?;
        let mut device = Device::try_from(row)?;

        device.delete_requested = true;
        device
            .begin_deletion()
            .map_err(|e| DbError::ValidationFailed(e.to_string()))?;

        DeviceRow::upsert(&mut *tx, &device).await?;
        tx.commit().await?;

        info!(serial_number = %device.serial_number, "Device deletion requested");
        Ok(device)
    }
}

/// Decode query rows, dropping rows that do not map to a valid device.
///
/// A dropped row stays in the table untouched and is reported on every run
/// until it is repaired.
fn decode_rows(rows: Vec<DeviceRow>) -> Vec<Device> {
    rows.into_iter()
        .filter_map(|row| {
            let device_id = row.id;
            match Device::try_from(row) {
                Ok(device) => Some(device),
                Err(e) => {
                    warn!(%device_id, error = %e, "Skipping undecodable device row");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl DeviceRegistry for PgDeviceRegistry {
    #[instrument(skip(self))]
    async fn query(&self, query: &DeviceQuery) -> ConnectorResult<Vec<Device>> {
        let rows = DeviceRow::query(self.pool.inner(), query)
            .await
            .map_err(DbError::from)?;
        debug!(count = rows.len(), "Registry query returned rows");

        Ok(decode_rows(rows))
    }

    #[instrument(skip(self, device), fields(device_id = %device.id, status = %device.status))]
    async fn upsert(&self, device: &Device) -> ConnectorResult<()> {
        DeviceRow::upsert(self.pool.inner(), device)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: DeviceId, _partition_key: &str) -> ConnectorResult<()> {
        let removed = DeviceRow::delete(self.pool.inner(), *id.as_uuid())
            .await
            .map_err(DbError::from)?;
        if !removed {
            debug!("Device record already absent");
        }
        Ok(())
    }
}
