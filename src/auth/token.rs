use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::credentials::fetch_client_credentials_token_with_expiry;
use crate::dataverse::store::CacheStore;
use crate::error::DataverseError;

/// Cache key of the persisted access token.
pub const TOKEN_CACHE_KEY: &str = ".token";

const REFRESH_SKEW_SECS: u64 = 300;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: Option<u64>,
    /// Scope the token was issued for.
    #[serde(default)]
    pub scope: String,
}

#[derive(Clone, Debug)]
pub enum AuthConfig {
    ClientCredentials {
        client_id: String,
        client_secret: String,
        tenant_id: String,
        scope: String,
    },
    /// A bearer token acquired elsewhere, e.g. by an interactive sign-in.
    StaticToken { access_token: String },
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn is_expiring_soon(expires_at: Option<u64>) -> bool {
    let Some(exp) = expires_at else {
        return true;
    };
    now_secs() + REFRESH_SKEW_SECS >= exp
}

/// `exp` claim of a JWT access token, if it can be read.
pub fn jwt_expiry(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    claims.get("exp")?.as_u64()
}

pub async fn fetch_token(auth: &AuthConfig) -> Result<CachedToken, DataverseError> {
    match auth {
        AuthConfig::ClientCredentials {
            client_id,
            client_secret,
            tenant_id,
            scope,
        } => {
            let token = fetch_client_credentials_token_with_expiry(
                client_id,
                client_secret,
                tenant_id,
                scope,
            )
            .await?;

            Ok(CachedToken {
                access_token: token.access_token,
                expires_at: Some(token.expires_at),
                scope: scope.clone(),
            })
        }
        AuthConfig::StaticToken { access_token } => static_token(access_token),
    }
}

fn static_token(access_token: &str) -> Result<CachedToken, DataverseError> {
    if access_token.trim().is_empty() {
        return Err(DataverseError::Auth("Access token was empty".to_string()));
    }

    let expires_at = jwt_expiry(access_token);
    if let Some(exp) = expires_at {
        if exp <= now_secs() {
            return Err(DataverseError::Auth(
                "Supplied access token has expired".to_string(),
            ));
        }
    }

    Ok(CachedToken {
        access_token: access_token.to_string(),
        expires_at,
        scope: String::new(),
    })
}

/// Return a usable access token, reusing the one in `store` when it was
/// issued for the same scope and is not about to expire.
pub async fn acquire_token<S: CacheStore + ?Sized>(
    auth: &AuthConfig,
    store: &S,
) -> Result<String, DataverseError> {
    let scope = match auth {
        AuthConfig::StaticToken { access_token } => {
            return static_token(access_token).map(|token| token.access_token);
        }
        AuthConfig::ClientCredentials { scope, .. } => scope,
    };

    if let Some(cached) = read_cached(store) {
        if cached.scope == *scope
            && !cached.access_token.trim().is_empty()
            && !is_expiring_soon(cached.expires_at)
        {
            log::info!("Reusing cached access token");
            return Ok(cached.access_token);
        }
    }

    let token = fetch_token(auth).await?;
    log::info!("Token received successfully");

    match serde_json::to_string(&token) {
        Ok(json) => {
            if let Err(e) = store.put(TOKEN_CACHE_KEY, &json) {
                log::warn!("Failed to cache access token: {}", e);
            }
        }
        Err(e) => log::warn!("Failed to serialize access token: {}", e),
    }

    Ok(token.access_token)
}

fn read_cached<S: CacheStore + ?Sized>(store: &S) -> Option<CachedToken> {
    let json = store.get(TOKEN_CACHE_KEY).ok()??;
    serde_json::from_str(&json).ok()
}
