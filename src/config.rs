//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `NONCE_SECRET` - Key for switch-form nonces (min 32 chars)
//!
//! ## Optional
//! - `DATABASE_URL` - `PostgreSQL` connection string; in-memory stores when unset
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `LOCATION_DEFAULT` - `bd` or `au` (default: bd)
//! - `LOCATION_CLEAR_CART_ON_SWITCH` - Empty the cart when the location changes (default: true)
//! - `LOCATION_SHOW_INDICATOR` - Render the location indicator in widgets (default: true)
//! - `LOCATION_COOKIE_SECURE` - Mark the location cookie `Secure` (default: false)
//! - `ADMIN_TOKEN` - Bearer token for admin endpoints; admin is disabled when unset
//! - `NATS_URL` - Publish domain events to NATS when set

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::domain::value_objects::Location;

const MIN_NONCE_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront location behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationSettings {
    pub default_location: Location,
    pub clear_cart_on_switch: bool,
    pub show_indicator: bool,
    pub cookie_secure: bool,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self { default_location: Location::Bd, clear_cart_on_switch: true, show_indicator: true, cookie_secure: false }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    pub host: IpAddr,
    pub port: u16,
    pub location: LocationSettings,
    pub nonce_secret: SecretString,
    pub admin_token: Option<SecretString>,
    pub nats_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "8083")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let default_location = Location::parse(&get_env_or_default("LOCATION_DEFAULT", "bd"))
            .ok_or_else(|| ConfigError::InvalidEnvVar("LOCATION_DEFAULT".to_string(), "expected bd or au".to_string()))?;
        let location = LocationSettings {
            default_location,
            clear_cart_on_switch: get_bool("LOCATION_CLEAR_CART_ON_SWITCH", true)?,
            show_indicator: get_bool("LOCATION_SHOW_INDICATOR", true)?,
            cookie_secure: get_bool("LOCATION_COOKIE_SECURE", false)?,
        };

        let nonce_secret = SecretString::from(get_required_env("NONCE_SECRET")?);
        validate_secret_length(&nonce_secret, "NONCE_SECRET")?;

        Ok(Self {
            database_url: get_optional_env("DATABASE_URL").map(SecretString::from),
            host,
            port,
            location,
            nonce_secret,
            admin_token: get_optional_env("ADMIN_TOKEN").map(SecretString::from),
            nats_url: get_optional_env("NATS_URL"),
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn get_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), format!("not a boolean: {raw}"))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_NONCE_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_NONCE_SECRET_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}
