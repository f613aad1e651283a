//! reqwest-backed client for the Clash Royale API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use super::{Endpoint, UpstreamApi, UpstreamError};

/// Authenticated client bound to one API root.
pub struct ClashRoyaleClient {
    client: Client,
    base_url: Url,
}

impl ClashRoyaleClient {
    /// Build a client that sends `token` as a bearer credential on every
    /// request. `timeout` of `None` leaves requests unbounded.
    pub fn new(
        base_url: Url,
        token: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, UpstreamError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| UpstreamError::Client("API token contains invalid characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self::from_builder(builder, base_url)
    }

    fn from_builder(builder: ClientBuilder, base_url: Url) -> Result<Self, UpstreamError> {
        let client = builder
            .build()
            .map_err(|e| UpstreamError::Client(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Full URL for an endpoint under the API root.
    fn url_for(&self, endpoint: &Endpoint) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint
        )
    }
}

#[async_trait]
impl UpstreamApi for ClashRoyaleClient {
    fn name(&self) -> &'static str {
        "clash-royale"
    }

    async fn get(&self, endpoint: &Endpoint) -> Result<Value, UpstreamError> {
        let url = self.url_for(endpoint);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                endpoint = %endpoint,
                status = status.as_u16(),
                body = %body,
                "Upstream request failed"
            );
            return Err(UpstreamError::Request {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::malformed(endpoint, e.to_string()))
    }
}
