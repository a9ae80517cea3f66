//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PARTS_API_BASE_URL` - Base URL of the remote parts API
//! - `PARTS_API_TOKEN` - Bearer token for the parts API
//!
//! ## Optional
//! - `PARTSHUB_HOST` - Bind address (default: 127.0.0.1)
//! - `PARTSHUB_PORT` - Listen port (default: 3000)
//! - `PARTSHUB_PICKUP_ADDRESS` - Fixed shipping label for store-pickup orders
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.0)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PICKUP_ADDRESS: &str = "PartsHub store - pickup counter";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Remote parts API configuration
    pub parts_api: PartsApiConfig,
    /// Fixed shipping label used for store-pickup orders
    pub pickup_address: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry trace sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Remote parts API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct PartsApiConfig {
    /// Base URL, normalized to end with a trailing slash so endpoint paths
    /// join below it instead of replacing the last segment
    pub base_url: Url,
    /// Bearer token (server-side only)
    pub token: SecretString,
}

impl std::fmt::Debug for PartsApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartsApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Ensure the base URL ends with `/` so `Url::join` appends path segments.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = match std::env::var("PARTSHUB_HOST") {
            Ok(value) => value
                .parse::<IpAddr>()
                .map_err(|e| ConfigError::InvalidEnvVar("PARTSHUB_HOST".to_string(), e.to_string()))?,
            Err(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let port = match std::env::var("PARTSHUB_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("PARTSHUB_PORT".to_string(), e.to_string()))?,
            Err(_) => 3000,
        };

        let base_url = require_env("PARTS_API_BASE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("PARTS_API_BASE_URL".to_string(), e.to_string())
        })?;
        let token = require_env("PARTS_API_TOKEN")?;
        if token.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "PARTS_API_TOKEN".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let pickup_address = std::env::var("PARTSHUB_PICKUP_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_PICKUP_ADDRESS.to_string());

        let sentry_sample_rate = parse_rate("SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?;

        Ok(Self {
            host,
            port,
            parts_api: PartsApiConfig {
                base_url: normalize_base_url(base_url),
                token: SecretString::from(token),
            },
            pickup_address,
            sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            sentry_environment: std::env::var("SENTRY_ENVIRONMENT").ok(),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Socket address to bind the server to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_rate(name: &str, default: f32) -> Result<f32, ConfigError> {
    match std::env::var(name) {
        Ok(value) => {
            let rate = value
                .parse::<f32>()
                .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))?;
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::InvalidEnvVar(
                    name.to_string(),
                    "must be between 0.0 and 1.0".to_string(),
                ));
            }
            Ok(rate)
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let url = Url::parse("https://api.partshub.store/v1").expect("valid URL");
        let normalized = normalize_base_url(url);
        assert_eq!(normalized.as_str(), "https://api.partshub.store/v1/");
        assert_eq!(
            normalized.join("products").expect("joinable").as_str(),
            "https://api.partshub.store/v1/products"
        );
    }

    #[test]
    fn test_normalized_base_url_is_stable() {
        let url = Url::parse("https://api.partshub.store/v1/").expect("valid URL");
        assert_eq!(
            normalize_base_url(url).as_str(),
            "https://api.partshub.store/v1/"
        );
    }
}
