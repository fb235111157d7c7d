//! Common test utilities for enrollsync-connector-entra integration tests.

#![cfg(feature = "integration")]
#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use enrollsync_connector_entra::{
    EntraCloudEnvironment, EntraConfig, EntraCredentials, GraphClient,
};

pub const TENANT_ID: &str = "test-tenant";

/// Test data factory for an imported device identity.
pub fn create_imported_identity(id: &str, identifier: &str, identity_type: &str) -> Value {
    json!({
        "id": id,
        "importedDeviceIdentifier": identifier,
        "importedDeviceIdentityType": identity_type,
        "enrollmentState": "notContacted",
        "platform": "unknown"
    })
}

/// Test data factory for a managed device.
pub fn create_managed_device(id: &str, manufacturer: &str, model: &str, serial: &str) -> Value {
    json!({
        "id": id,
        "manufacturer": manufacturer,
        "model": model,
        "serialNumber": serial
    })
}

/// Wraps items in an OData response format.
pub fn create_odata_response(items: Vec<Value>, next_link: Option<&str>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

/// Creates an OData error response.
pub fn create_odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Creates a mock OAuth token response.
pub fn create_token_response(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}

/// Mock server wrapper with common setup helpers.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    /// Creates a new mock Graph API server with the token endpoint mounted.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let mock = Self { server };
        mock.mock_token_endpoint().await;
        mock
    }

    /// Returns the mock server's base URL.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Graph client pointed at this server with fast retries.
    pub fn client(&self) -> GraphClient {
        let config = EntraConfig::builder()
            .tenant_id(TENANT_ID)
            .cloud_environment(EntraCloudEnvironment::Custom {
                login_endpoint: self.url(),
                graph_endpoint: self.url(),
            })
            .max_retries(2)
            .initial_backoff(Duration::from_millis(10))
            .build()
            .unwrap();
        GraphClient::new(&config, EntraCredentials::new("client-id", "client-secret")).unwrap()
    }

    async fn mock_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(format!("/{TENANT_ID}/oauth2/v2.0/token")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 3600)),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up the import endpoint returning the given records.
    pub async fn mock_import_endpoint(&self, records: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path(
                "/beta/deviceManagement/importedDeviceIdentities/importDeviceIdentityList",
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(create_odata_response(records, None)),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up a GET or DELETE on a single imported identity.
    pub async fn mock_imported_identity(&self, http_method: &str, id: &str, status: u16) {
        let response = if status == 200 {
            ResponseTemplate::new(200).set_body_json(create_imported_identity(
                id,
                "ABC123",
                "serialNumber",
            ))
        } else if status == 204 {
            ResponseTemplate::new(204)
        } else {
            ResponseTemplate::new(status)
                .set_body_json(create_odata_error("ResourceNotFound", "No such identity"))
        };

        Mock::given(method(http_method))
            .and(path(format!(
                "/beta/deviceManagement/importedDeviceIdentities/{id}"
            )))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Sets up a DELETE on a single managed device.
    pub async fn mock_delete_managed_device(&self, id: &str, status: u16) {
        let response = if status == 204 {
            ResponseTemplate::new(204)
        } else {
            ResponseTemplate::new(status)
                .set_body_json(create_odata_error("ResourceNotFound", "No such device"))
        };

        Mock::given(method("DELETE"))
            .and(path(format!("/beta/deviceManagement/managedDevices/{id}")))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}
