use async_trait::async_trait;
use serde_json::Value;

use crate::error::DataverseError;

/// Path of the Web API relative to the environment URL.
pub const API_PATH: &str = "api/data/v9.2";

/// Status code and raw body of a Web API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON, falling back to the raw text as a JSON string.
    /// An empty body decodes to `null`.
    pub fn content(&self) -> Value {
        if self.body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

/// Authenticated HTTP channel to a Dataverse environment.
///
/// Implementations attach authorization and OData headers themselves; callers
/// only deal in URIs and JSON bodies. Requests are issued one at a time.
#[async_trait]
pub trait Transport {
    /// Environment URL without a trailing slash.
    fn base_url(&self) -> &str;

    /// Build a Web API URI for `endpoint` with optional query parameters.
    fn build_uri(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        build_uri(self.base_url(), endpoint, params)
    }

    async fn get(&self, uri: &str) -> Result<HttpResponse, DataverseError>;

    async fn post(&self, uri: &str, body: &Value) -> Result<HttpResponse, DataverseError>;
}

/// `<base>/api/data/v9.2/<endpoint>?k=v&...`, omitting `?` when there are no
/// parameters. Values are URL-escaped with `/` left intact.
pub fn build_uri(base_url: &str, endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut uri = format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        API_PATH,
        endpoint.trim_end_matches('/')
    );

    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value).replace("%2F", "/")))
        .collect::<Vec<String>>()
        .join("&");

    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query);
    }

    uri
}

/// Pull `error.message` out of a Dataverse error body, or return the raw text.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(|message| message.as_str())
            .map(|message| message.to_string())
            .unwrap_or_default(),
        Err(_) => body.to_string(),
    }
}

/// GET `endpoint` and return the body of a 200/201 response.
pub async fn query<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &str,
    params: &[(&str, &str)],
) -> Result<String, DataverseError> {
    let uri = transport.build_uri(endpoint, params);
    log::info!("Sending GET request to: {}", uri);

    let response = transport.get(&uri).await?;
    if response.status != 200 && response.status != 201 {
        return Err(DataverseError::Http {
            status: response.status,
            message: error_message(&response.body),
        });
    }

    log::debug!("Request successful");
    Ok(response.body)
}
