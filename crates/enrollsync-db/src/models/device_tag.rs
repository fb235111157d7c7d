//! Device tag rows.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use enrollsync_core::{Tag, TagId};

/// A row of the `device_tags` table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceTagRow {
    pub id: Uuid,
    pub name: String,
    pub sync_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DeviceTagRow> for Tag {
    fn from(row: DeviceTagRow) -> Self {
        Tag {
            id: TagId::from_uuid(row.id),
            name: row.name,
            sync_enabled: row.sync_enabled,
        }
    }
}

impl DeviceTagRow {
    /// Sync flag of a tag, `None` if the tag does not exist.
    pub async fn sync_enabled<'e, E>(executor: E, id: Uuid) -> Result<Option<bool>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let row: Option<(bool,)> =
            sqlx::query_as("SELECT sync_enabled FROM device_tags WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(row.map(|r| r.0))
    }

    /// Ids of all tags with sync enabled.
    pub async fn list_sync_enabled_ids<'e, E>(executor: E) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM device_tags WHERE sync_enabled")
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// List all tags ordered by name.
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query_as(
            r"
            SELECT id, name, sync_enabled, created_at, updated_at
            FROM device_tags
            ORDER BY name
            ",
        )
        .fetch_all(executor)
        .await
    }

    /// Create or update a tag.
    pub async fn upsert<'e, E>(executor: E, tag: &Tag) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query_as(
            r"
            INSERT INTO device_tags (id, name, sync_enabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                sync_enabled = EXCLUDED.sync_enabled,
                updated_at = NOW()
            RETURNING id, name, sync_enabled, created_at, updated_at
            ",
        )
        .bind(*tag.id.as_uuid())
        .bind(&tag.name)
        .bind(tag.sync_enabled)
        .fetch_one(executor)
        .await
    }
}
