use std::collections::HashMap;

use reqwest::Client;
use serde_json::Value;

use crate::auth::token::now_secs;
use crate::error::DataverseError;

const AUTHORITY_BASE: &str = "https://login.microsoftonline.com";

pub struct ClientCredentialsToken {
    pub access_token: String,
    pub expires_at: u64,
}

pub async fn fetch_client_credentials_token(
    client_id: &str,
    client_secret: &str,
    tenant_id: &str,
    scope: &str,
) -> Result<String, DataverseError> {
    let token = fetch_client_credentials_token_with_expiry(
        client_id,
        client_secret,
        tenant_id,
        scope,
    )
    .await?;
    Ok(token.access_token)
}

pub async fn fetch_client_credentials_token_with_expiry(
    client_id: &str,
    client_secret: &str,
    tenant_id: &str,
    scope: &str,
) -> Result<ClientCredentialsToken, DataverseError> {
    let client = Client::new();
    let token_url = format!("{}/{}/oauth2/v2.0/token", AUTHORITY_BASE, tenant_id);

    let mut params = HashMap::new();
    params.insert("client_id", client_id);
    params.insert("client_secret", client_secret);
    params.insert("scope", scope);
    params.insert("grant_type", "client_credentials");

    let resp = client
        .post(&token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| DataverseError::Auth(e.to_string()))?;

    if !resp.status().is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(DataverseError::Auth(token_error(&body)));
    }

    let json: Value = resp
        .json()
        .await
        .map_err(|e| DataverseError::Auth(e.to_string()))?;

    parse_token_response(&json, now_secs())
}

fn parse_token_response(json: &Value, now: u64) -> Result<ClientCredentialsToken, DataverseError> {
    let access_token = json
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataverseError::Auth("No access_token in response".to_string()))?;
    let expires_in = json
        .get("expires_in")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| DataverseError::Auth("No expires_in in response".to_string()))?;

    if access_token.trim().is_empty() {
        return Err(DataverseError::Auth("Access token was empty".to_string()));
    }

    Ok(ClientCredentialsToken {
        access_token: access_token.to_string(),
        expires_at: now + expires_in,
    })
}

/// `error`, `error_description` and `correlation_id` of an identity platform
/// error body, or the raw body.
fn token_error(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    let field = |name: &str, fallback: &str| {
        json.get(name)
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string()
    };

    format!(
        "{}, Description: {}, Correlation ID: {}",
        field("error", "Unknown error"),
        field("error_description", "No description provided"),
        field("correlation_id", "N/A")
    )
}
