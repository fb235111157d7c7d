//! Device inventory over Intune managed devices.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::{form_urlencoded, Url};

use enrollsync_connector::{ConnectorError, ConnectorResult, DeviceInventory, ManagedDevice};
use enrollsync_core::HardwareTriple;

use crate::graph_client::ODataResponse;
use crate::{EntraError, EntraResult, GraphClient};

const MANAGED_DEVICES_PATH: &str = "deviceManagement/managedDevices";
const SELECT_FIELDS: &str = "id,manufacturer,model,serialNumber";

/// Managed device as returned by Graph.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphManagedDevice {
    id: String,
    #[serde(default)]
    manufacturer: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    serial_number: Option<String>,
}

impl From<GraphManagedDevice> for ManagedDevice {
    fn from(d: GraphManagedDevice) -> Self {
        ManagedDevice {
            id: d.id,
            make: d.manufacturer.unwrap_or_default(),
            model: d.model.unwrap_or_default(),
            serial_number: d.serial_number.unwrap_or_default(),
        }
    }
}

/// Escape a value for use inside a single-quoted `OData` string literal.
fn odata_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Percent-encode a query value with `%20` for spaces.
fn encode_query_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// [`DeviceInventory`] backed by Intune managed devices.
#[derive(Debug, Clone)]
pub struct IntuneInventory {
    client: GraphClient,
}

impl IntuneInventory {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    fn search_url(&self, serial_number: &str) -> EntraResult<String> {
        let filter = format!("serialNumber eq {}", odata_quote(serial_number));
        let mut url = Url::parse(&self.client.url(MANAGED_DEVICES_PATH))?;
        url.set_query(Some(&format!(
            "$filter={}&$select={}",
            encode_query_value(&filter),
            SELECT_FIELDS
        )));
        Ok(url.into())
    }

    fn record_url(&self, id: &str) -> EntraResult<String> {
        let mut url = Url::parse(&self.client.url(MANAGED_DEVICES_PATH))?;
        url.path_segments_mut()
            .map_err(|()| EntraError::Config("Graph base URL cannot be a base".to_string()))?
            .push(id);
        Ok(url.into())
    }

    async fn search(&self, triple: &HardwareTriple<'_>) -> EntraResult<Option<ManagedDevice>> {
        let mut next = Some(self.search_url(triple.serial_number)?);

        while let Some(url) = next {
            let page: ODataResponse<GraphManagedDevice> = self.client.get(&url).await?;
            // The serial filter is not unique across vendors.
            if let Some(found) = page
                .value
                .into_iter()
                .map(ManagedDevice::from)
                .find(|d| d.matches(triple))
            {
                return Ok(Some(found));
            }
            next = page.next_link;
        }

        Ok(None)
    }
}

#[async_trait]
impl DeviceInventory for IntuneInventory {
    #[instrument(skip(self, triple), fields(hardware = %triple))]
    async fn find_managed_device(
        &self,
        triple: &HardwareTriple<'_>,
    ) -> ConnectorResult<Option<ManagedDevice>> {
        let found = self.search(triple).await?;
        debug!(found = found.is_some(), "Searched managed devices");
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn delete_managed_device(&self, id: &str) -> ConnectorResult<bool> {
        let url = self.record_url(id)?;
        match self.client.delete(&url).await {
            Ok(()) => {
                info!("Deleted managed device");
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                debug!("Managed device already absent");
                Ok(true)
            }
            Err(e) => Err(ConnectorError::from(e)),
        }
    }
}
