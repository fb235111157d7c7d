//! Postgres-backed tag policy store.

use async_trait::async_trait;
use std::collections::HashSet;

use enrollsync_connector::{ConnectorResult, TagPolicyStore};
use enrollsync_core::{Tag, TagId};

use crate::error::DbError;
use crate::models::DeviceTagRow;
use crate::pool::DbPool;

/// [`TagPolicyStore`] over the `device_tags` table.
#[derive(Debug, Clone)]
pub struct PgTagPolicyStore {
    pool: DbPool,
}

impl PgTagPolicyStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create or update a tag.
    ///
    /// # Errors
    ///
    /// Returns a `DbError` if the write fails.
    pub async fn save(&self, tag: &Tag) -> Result<Tag, DbError> {
        Ok(DeviceTagRow::upsert(self.pool.inner(), tag).await?.into())
    }

    /// All tags ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a `DbError` if the query fails.
    pub async fn list(&self) -> Result<Vec<Tag>, DbError> {
        Ok(DeviceTagRow::list(self.pool.inner())
            .await?
            .into_iter()
            .map(Tag::from)
            .collect())
    }
}

#[async_trait]
impl TagPolicyStore for PgTagPolicyStore {
    async fn is_sync_enabled(&self, tag_id: TagId) -> ConnectorResult<bool> {
        let enabled = DeviceTagRow::sync_enabled(self.pool.inner(), *tag_id.as_uuid())
            .await
            .map_err(DbError::from)?;
        Ok(enabled.unwrap_or(false))
    }

    async fn list_sync_enabled_tag_ids(&self) -> ConnectorResult<HashSet<TagId>> {
        let ids = DeviceTagRow::list_sync_enabled_ids(self.pool.inner())
            .await
            .map_err(DbError::from)?;
        Ok(ids.into_iter().map(TagId::from_uuid).collect())
    }
}
