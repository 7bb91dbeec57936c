use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::auth::AuthConfig;
use crate::error::DataverseError;

/// Connection settings for one Dataverse environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(alias = "environmentURI")]
    pub environment_uri: String,
    #[serde(alias = "clientID")]
    pub client_id: String,
    #[serde(alias = "tenantID")]
    pub tenant_id: String,
    #[serde(alias = "clientSecret", default)]
    pub client_secret: Option<String>,
}

impl ConnectionConfig {
    pub fn from_file(path: &Path) -> Result<Self, DataverseError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            DataverseError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, DataverseError> {
        let config: ConnectionConfig = serde_json::from_str(json)
            .map_err(|e| DataverseError::Config(format!("Invalid connection config: {e}")))?;

        if config.environment_uri.trim().is_empty() {
            return Err(DataverseError::Config(
                "environmentURI must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Environment URL without a trailing slash.
    pub fn environment(&self) -> &str {
        self.environment_uri.trim_end_matches('/')
    }

    /// Application scope for client-credential tokens.
    pub fn scope(&self) -> String {
        format!("{}/.default", self.environment())
    }

    /// Client-credentials auth when a secret is configured, otherwise the
    /// supplied bearer token.
    pub fn auth(&self, access_token: Option<&str>) -> Result<AuthConfig, DataverseError> {
        if let Some(token) = access_token {
            return Ok(AuthConfig::StaticToken {
                access_token: token.to_string(),
            });
        }

        match &self.client_secret {
            Some(secret) if !secret.trim().is_empty() => Ok(AuthConfig::ClientCredentials {
                client_id: self.client_id.clone(),
                client_secret: secret.clone(),
                tenant_id: self.tenant_id.clone(),
                scope: self.scope(),
            }),
            _ => Err(DataverseError::Auth(
                "No clientSecret configured and no access token supplied".to_string(),
            )),
        }
    }
}
