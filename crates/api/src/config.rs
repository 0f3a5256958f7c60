//! Server configuration
//!
//! Everything comes from the environment and is validated once at
//! startup. A missing or malformed value here is a fatal configuration
//! error (process exit 1); nothing in this module is re-read later.

use std::sync::Arc;

use http::HeaderValue;
use thiserror::Error;

use strongbox_crypto::MasterKey;

/// Fatal configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

/// One OAuth provider's client settings.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub master_key: Arc<MasterKey>,
    pub jwt_secret: Vec<u8>,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub hash_cost: u32,
    pub frontend_origin: HeaderValue,
    pub frontend_url: String,
    pub google: Option<OAuthClientConfig>,
    pub github: Option<OAuthClientConfig>,
    pub port: u16,
    pub production: bool,
    pub max_body_bytes: usize,
    pub db_max_connections: u32,
    /// Auth bucket: requests per 15 minutes per client address.
    pub auth_rate_per_window: u32,
    /// General bucket: requests per 15 minutes per client address.
    pub general_rate_per_window: u32,
}

impl AppConfig {
    /// Reads and validates the full configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("DATABASE_URL")?;

        let master_key = MasterKey::from_base64(&require("STRONGBOX_MASTER_KEY")?)
            .map_err(|e| ConfigError::Invalid("STRONGBOX_MASTER_KEY", e.to_string()))?;

        let jwt_secret = require("STRONGBOX_JWT_SECRET")?.into_bytes();
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "STRONGBOX_JWT_SECRET",
                "must be at least 32 bytes".into(),
            ));
        }

        let frontend_url = std::env::var("STRONGBOX_FRONTEND_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());
        let frontend_origin = frontend_url
            .parse::<HeaderValue>()
            .map_err(|e| ConfigError::Invalid("STRONGBOX_FRONTEND_ORIGIN", e.to_string()))?;

        let production = std::env::var("APP_ENV").is_ok_and(|v| v == "production");

        Ok(Self {
            database_url,
            master_key: Arc::new(master_key),
            jwt_secret,
            access_ttl_secs: parse_or("STRONGBOX_ACCESS_TTL_SECS", 900)?,
            refresh_ttl_secs: parse_or("STRONGBOX_REFRESH_TTL_SECS", 30 * 24 * 3600)?,
            hash_cost: parse_or("STRONGBOX_HASH_COST", 3)?,
            frontend_origin,
            frontend_url,
            google: oauth_client("STRONGBOX_GOOGLE"),
            github: oauth_client("STRONGBOX_GITHUB"),
            port: parse_or("PORT", 4000)?,
            production,
            max_body_bytes: parse_or("STRONGBOX_MAX_BODY_BYTES", 10 * 1024)?,
            db_max_connections: parse_or("STRONGBOX_DB_MAX_CONNECTIONS", 10)?,
            auth_rate_per_window: parse_or("STRONGBOX_AUTH_RATE_LIMIT", 20)?,
            general_rate_per_window: parse_or("STRONGBOX_GENERAL_RATE_LIMIT", 100)?,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(name, e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Reads `<prefix>_CLIENT_ID` / `_CLIENT_SECRET` / `_CALLBACK_URL`; the
/// provider is disabled unless all three are present.
fn oauth_client(prefix: &str) -> Option<OAuthClientConfig> {
    let get = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();
    Some(OAuthClientConfig {
        client_id: get("CLIENT_ID")?,
        client_secret: get("CLIENT_SECRET")?,
        callback_url: get("CALLBACK_URL")?,
    })
}
