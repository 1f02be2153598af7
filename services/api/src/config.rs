//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use axum::http::HeaderValue;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// What sign-in does when the user upsert fails in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignInFailurePolicy {
    /// Refuse the sign-in.
    Reject,
    /// Log the failure and continue with the existing user row, if there is one.
    Ignore,
}

impl FromStr for SignInFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!("'{}' is not one of reject, ignore", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub db_max_connections: u32,
    pub cors_origin: HeaderValue,
    /// Shared with the identity provider's callback; sign-in requests must carry it.
    pub identity_bridge_secret: String,
    pub signin_failure_policy: SignInFailurePolicy,
    pub session_ttl_days: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", "5")?;
        let cors_origin = parse_var("CORS_ORIGIN", "http://localhost:3000")?;

        // --- Load Identity Bridge Settings ---
        let identity_bridge_secret = std::env::var("IDENTITY_BRIDGE_SECRET")
            .map_err(|_| ConfigError::MissingVar("IDENTITY_BRIDGE_SECRET".to_string()))?;
        if identity_bridge_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "IDENTITY_BRIDGE_SECRET".to_string(),
                "must not be empty".to_string(),
            ));
        }
        let signin_failure_policy = parse_var("SIGNIN_FAILURE_POLICY", "reject")?;
        let session_ttl_days: i64 = parse_var("SESSION_TTL_DAYS", "30")?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            db_max_connections,
            cors_origin,
            identity_bridge_secret,
            signin_failure_policy,
            session_ttl_days,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("database_url", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("cors_origin", &self.cors_origin)
            .field("identity_bridge_secret", &"<redacted>")
            .field("signin_failure_policy", &self.signin_failure_policy)
            .field("session_ttl_days", &self.session_ttl_days)
            .finish()
    }
}

/// Reads `name`, falling back to `default`, and parses it.
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
