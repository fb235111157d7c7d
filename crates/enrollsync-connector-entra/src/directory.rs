//! Identity directory over Intune imported device identities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use enrollsync_connector::{
    ConnectorError, ConnectorResult, DirectoryRecord, IdentityDirectory,
};
use enrollsync_core::{CanonicalIdentifier, IdentifierType};

use crate::{EntraError, EntraResult, GraphClient};

const IMPORTED_IDENTITIES_PATH: &str = "deviceManagement/importedDeviceIdentities";

/// Body of `importDeviceIdentityList`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest<'a> {
    imported_device_identities: Vec<ImportedIdentityInput<'a>>,
    overwrite_imported_device_identities: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportedIdentityInput<'a> {
    imported_device_identifier: &'a str,
    imported_device_identity_type: &'static str,
}

/// Imported identity as returned by Graph.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedIdentity {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    imported_device_identifier: Option<String>,
    #[serde(default)]
    imported_device_identity_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    #[serde(default)]
    value: Vec<ImportedIdentity>,
}

/// [`IdentityDirectory`] backed by Intune's corporate device identifiers.
#[derive(Debug, Clone)]
pub struct IntuneDirectory {
    client: GraphClient,
}

impl IntuneDirectory {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    fn record_url(&self, id: &str) -> EntraResult<String> {
        let mut url = Url::parse(&self.client.url(IMPORTED_IDENTITIES_PATH))?;
        url.path_segments_mut()
            .map_err(|()| EntraError::Config("Graph base URL cannot be a base".to_string()))?
            .push(id);
        Ok(url.into())
    }

    async fn import(&self, identifier: &CanonicalIdentifier) -> EntraResult<DirectoryRecord> {
        let url = self
            .client
            .url(&format!("{IMPORTED_IDENTITIES_PATH}/importDeviceIdentityList"));
        let body = ImportRequest {
            imported_device_identities: vec![ImportedIdentityInput {
                imported_device_identifier: &identifier.value,
                imported_device_identity_type: identifier.identifier_type.as_str(),
            }],
            overwrite_imported_device_identities: false,
        };

        let response: ImportResponse = self.client.post(&url, &body).await?;

        let record = response
            .value
            .into_iter()
            .find_map(|r| {
                let id = r.id.filter(|id| !id.is_empty())?;
                Some((id, r.imported_device_identifier, r.imported_device_identity_type))
            })
            .ok_or_else(|| {
                EntraError::UnexpectedResponse(
                    "importDeviceIdentityList returned no record id".to_string(),
                )
            })?;

        let (id, value, identifier_type) = record;
        Ok(DirectoryRecord {
            id,
            value: value.unwrap_or_else(|| identifier.value.clone()),
            identifier_type: identifier_type
                .and_then(|t| t.parse::<IdentifierType>().ok())
                .unwrap_or(identifier.identifier_type),
        })
    }
}

#[async_trait]
impl IdentityDirectory for IntuneDirectory {
    #[instrument(skip(self, identifier), fields(identifier_type = %identifier.identifier_type.as_str()))]
    async fn add_identifier(
        &self,
        identifier: &CanonicalIdentifier,
    ) -> ConnectorResult<DirectoryRecord> {
        let record = self.import(identifier).await?;
        info!(record_id = %record.id, "Imported device identifier");
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn exists(&self, id: &str) -> ConnectorResult<bool> {
        let url = self.record_url(id)?;
        match self.client.get::<ImportedIdentity>(&url).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                debug!("Imported identifier no longer present");
                Ok(false)
            }
            Err(e) => Err(ConnectorError::from(e)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_identifier(&self, id: &str) -> ConnectorResult<bool> {
        let url = self.record_url(id)?;
        match self.client.delete(&url).await {
            Ok(()) => {
                info!("Deleted imported device identifier");
                Ok(true)
            }
            // Graph answers 400 for ids it has already dropped.
            Err(e) if e.is_not_found() || e.is_bad_request() => {
                debug!(status = ?e.status(), "Imported identifier already absent");
                Ok(true)
            }
            Err(e) => Err(ConnectorError::from(e)),
        }
    }
}
