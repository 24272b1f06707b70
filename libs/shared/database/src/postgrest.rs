use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Every datastore round-trip carries a bounded timeout so a stalled
/// connection cannot hold a booking request open indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin client for the relational datastore's PostgREST-style HTTP surface.
/// Rows are addressed by path plus filter query string, e.g.
/// `/rest/v1/booking_intakes?event_id=eq.abc123`.
pub struct DatastoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DatastoreClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.datastore_url.clone(),
            api_key: config.datastore_api_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.api_key).map_err(|_| anyhow!("invalid api key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| anyhow!("invalid api key"))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making datastore request to {}", url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Datastore error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Datastore authentication error: {}", error_text),
                404 => anyhow!("Datastore resource not found: {}", error_text),
                _ => anyhow!("Datastore error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Builder variant for tests pointing at a mock server.
    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
