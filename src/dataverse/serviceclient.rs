use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::dataverse::transport::{HttpResponse, Transport};
use crate::error::DataverseError;
use crate::LogLevel;

/// HTTP client for Dataverse Web API operations.
pub struct ServiceClient {
    client: Client,
    base_url: String,
    token: String,
    log_level: LogLevel,
}

impl ServiceClient {
    /// Create a new client for the given environment URL and access token.
    pub fn new(base_url: &str, token: &str, log_level: LogLevel) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            log_level,
        }
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .header("If-None-Match", "null")
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<HttpResponse, DataverseError> {
        let resp = request
            .send()
            .await
            .map_err(|e| DataverseError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| DataverseError::Request(format!("Failed to read response body: {e}")))?;

        if matches!(self.log_level, LogLevel::Debug) {
            log::debug!("Response ({}): {}", status, body);
        }

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ServiceClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, uri: &str) -> Result<HttpResponse, DataverseError> {
        log::debug!("GET {}", uri);
        self.send(self.with_headers(self.client.get(uri))).await
    }

    async fn post(&self, uri: &str, body: &Value) -> Result<HttpResponse, DataverseError> {
        log::debug!("POST {}", uri);
        if matches!(self.log_level, LogLevel::Debug) {
            log::debug!("Payload: {}", body);
        }

        let request = self
            .with_headers(self.client.post(uri))
            .header("Prefer", "return=representation")
            .json(body);

        self.send(request).await
    }
}
