//! Device registry rows.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use enrollsync_connector::DeviceQuery;
use enrollsync_core::{Device, DeviceId, DeviceStatus, IdentifierType, OsKind, TagId};

use crate::error::DbError;

const DEVICE_COLUMNS: &str = "id, make, model, serial_number, os, tag_id, status, \
     identifier_id, identifier_value, identifier_type, last_sync_at, delete_requested";

/// A row of the `devices` table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRow {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub serial_number: String,
    pub os: Option<String>,
    pub tag_id: Option<Uuid>,
    /// NULL reads as `Added`.
    pub status: Option<String>,
    pub identifier_id: Option<String>,
    pub identifier_value: Option<String>,
    pub identifier_type: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub delete_requested: bool,
}

impl TryFrom<DeviceRow> for Device {
    type Error = DbError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_deref() {
            None | Some("") => DeviceStatus::Added,
            Some(s) => s
                .parse::<DeviceStatus>()
                .map_err(|e| DbError::InvalidRow(format!("device {}: {e}", row.id)))?,
        };
        let identifier_type = row
            .identifier_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::parse::<IdentifierType>)
            .transpose()
            .map_err(|e| DbError::InvalidRow(format!("device {}: {e}", row.id)))?;

        Ok(Device {
            id: DeviceId::from_uuid(row.id),
            make: row.make,
            model: row.model,
            serial_number: row.serial_number,
            os: OsKind::parse(row.os.as_deref()),
            tag_id: row.tag_id.map(TagId::from_uuid),
            status,
            identifier_id: row.identifier_id,
            identifier_value: row.identifier_value,
            identifier_type,
            last_sync_at: row.last_sync_at,
            delete_requested: row.delete_requested,
        })
    }
}

impl DeviceRow {
    /// Select devices matching a registry query, ordered by id.
    pub async fn query<'e, E>(executor: E, query: &DeviceQuery) -> Result<Vec<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let statuses: Vec<String> = query
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let limit = query.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let sql = format!(
            r"
            SELECT {DEVICE_COLUMNS} FROM devices
            WHERE (status = ANY($1) OR ($2 AND status IS NULL))
              AND ($3::timestamptz IS NULL OR last_sync_at IS NULL OR last_sync_at < $3)
            ORDER BY id
            LIMIT $4
            "
        );

        sqlx::query_as(&sql)
            .bind(statuses)
            .bind(query.includes_unset_status())
            .bind(query.synced_before)
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    /// Get a device by id.
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1");
        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Get a device by id and lock it for the rest of the transaction.
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1 FOR UPDATE");
        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert or replace the full record.
    pub async fn upsert<'e, E>(executor: E, device: &Device) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r"
            INSERT INTO devices (
                id, make, model, serial_number, os, tag_id, status,
                identifier_id, identifier_value, identifier_type,
                last_sync_at, delete_requested
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                make = EXCLUDED.make,
                model = EXCLUDED.model,
                serial_number = EXCLUDED.serial_number,
                os = EXCLUDED.os,
                tag_id = EXCLUDED.tag_id,
                status = EXCLUDED.status,
                identifier_id = EXCLUDED.identifier_id,
                identifier_value = EXCLUDED.identifier_value,
                identifier_type = EXCLUDED.identifier_type,
                last_sync_at = EXCLUDED.last_sync_at,
                delete_requested = EXCLUDED.delete_requested,
                updated_at = NOW()
            ",
        )
        .bind(*device.id.as_uuid())
        .bind(&device.make)
        .bind(&device.model)
        .bind(&device.serial_number)
        .bind(device.os.as_str())
        .bind(device.tag_id.map(|t| *t.as_uuid()))
        .bind(device.status.as_str())
        .bind(device.identifier_id.as_deref())
        .bind(device.identifier_value.as_deref())
        .bind(device.identifier_type.map(|t| t.as_str()))
        .bind(device.last_sync_at)
        .bind(device.delete_requested)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Delete a device. Returns true if a row was removed.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
