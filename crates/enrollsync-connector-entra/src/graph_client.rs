//! Microsoft Graph HTTP client with throttling and transient-error retries.

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{EntraConfig, EntraCredentials, EntraError, EntraResult, TokenCache};

/// `OData` error response from Microsoft Graph.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

/// `OData` error body.
#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
}

/// Collection response wrapper.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Microsoft Graph API client.
///
/// Cloneable handle; clones share the HTTP connection pool and token cache.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: String,
    max_retries: u32,
    initial_backoff: Duration,
    max_retry_after: Duration,
}

impl GraphClient {
    /// Creates a new Graph client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &EntraConfig, credentials: EntraCredentials) -> EntraResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EntraError::Config(format!("Failed to create HTTP client: {e}")))?;

        let token_cache = Arc::new(TokenCache::new(
            credentials,
            config.cloud_environment.clone(),
            config.tenant_id.clone(),
            http_client.clone(),
        ));

        Ok(Self {
            http_client,
            token_cache,
            base_url: config.graph_base_url(),
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            max_retry_after: config.max_retry_after,
        })
    }

    /// Returns the base URL for Graph API requests.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins a relative resource path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Performs a GET request and decodes the JSON body.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> EntraResult<T> {
        let response = self.send(Method::GET, url, None::<&()>).await?;
        Ok(response.json().await?)
    }

    /// Performs a POST request and decodes the JSON body.
    #[instrument(skip(self, body))]
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> EntraResult<T> {
        let response = self.send(Method::POST, url, Some(body)).await?;
        Ok(response.json().await?)
    }

    /// Performs a DELETE request. Success is usually 204 No Content.
    #[instrument(skip(self))]
    pub async fn delete(&self, url: &str) -> EntraResult<()> {
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    /// Sends a request, retrying throttled and 5xx responses.
    async fn send<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> EntraResult<Response> {
        let mut retries = 0u32;
        let mut delay = self.initial_backoff;
        let mut reauthenticated = false;

        loop {
            let token = self.token_cache.get_token().await?;

            let mut request = self
                .http_client
                .request(method.clone(), url)
                .bearer_auth(&token);
            if let Some(b) = body {
                request = request.json(b);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            // An expired token can be rejected before its advertised expiry.
            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                debug!("Graph returned 401, refreshing token");
                self.token_cache.invalidate().await;
                reauthenticated = true;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(&response).unwrap_or(delay);
                if retries >= self.max_retries {
                    return Err(EntraError::RateLimited {
                        attempts: retries + 1,
                        retry_after_secs: retry_after.as_secs(),
                    });
                }
                let wait = retry_after.min(self.max_retry_after);
                retries += 1;
                warn!(
                    retry = retries,
                    max_retries = self.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    "Graph throttled request"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            if matches!(
                status,
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
            ) && retries < self.max_retries
            {
                retries += 1;
                warn!(
                    status = status.as_u16(),
                    retry = retries,
                    max_retries = self.max_retries,
                    "Transient Graph error, retrying after {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            return Err(error_from_response(response).await);
        }
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

async fn error_from_response(response: Response) -> EntraError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ODataError>(&body) {
        Ok(odata) => EntraError::GraphApi {
            status: status.as_u16(),
            code: odata.error.code,
            message: odata.error.message,
        },
        Err(_) => EntraError::GraphApi {
            status: status.as_u16(),
            code: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: body,
        },
    }
}
