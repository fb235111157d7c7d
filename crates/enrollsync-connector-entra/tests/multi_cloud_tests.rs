//! Integration tests for multi-cloud endpoint support.

#![cfg(feature = "integration")]

use enrollsync_connector_entra::{EntraCloudEnvironment, EntraConfig};

#[test]
fn test_commercial_cloud_endpoints() {
    let env = EntraCloudEnvironment::Commercial;

    assert_eq!(env.login_endpoint(), "https://login.microsoftonline.com");
    assert_eq!(env.graph_endpoint(), "https://graph.microsoft.com");
}

#[test]
fn test_us_government_endpoints() {
    let env = EntraCloudEnvironment::UsGovernment;

    assert_eq!(env.login_endpoint(), "https://login.microsoftonline.us");
    assert_eq!(env.graph_endpoint(), "https://graph.microsoft.us");
}

#[test]
fn test_china_cloud_endpoints() {
    let env = EntraCloudEnvironment::China;

    assert_eq!(env.login_endpoint(), "https://login.chinacloudapi.cn");
    assert_eq!(env.graph_endpoint(), "https://microsoftgraph.chinacloudapi.cn");
}

#[test]
fn test_base_url_uses_cloud_and_version() {
    let config = EntraConfig::builder()
        .tenant_id("contoso")
        .cloud_environment(EntraCloudEnvironment::UsGovernment)
        .api_version("v1.0")
        .build()
        .unwrap();

    assert_eq!(config.graph_base_url(), "https://graph.microsoft.us/v1.0");
}
