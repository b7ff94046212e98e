//! Application configuration loaded from environment variables.

use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `SECRET_KEY`: token signing secret (required)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `CLIENT_ORIGIN`: allowed CORS origin (default: `"http://localhost:5174"`)
/// - `REQUEST_TIMEOUT_SECS`: per-request deadline (default: `10`)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
///
/// Secrets are wrapped in [`SecretString`], so `Debug` output never shows them.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub secret_key: SecretString,
    pub database_url: SecretString,
    pub client_origin: HeaderValue,
    pub request_timeout: Duration,
    pub database_max_connections: u32,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        Ok(Self {
            secret_key: SecretString::from(required("SECRET_KEY")?),
            database_url: SecretString::from(required("DATABASE_URL")?),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 3000)?,
            log_level: match get("RUST_LOG") {
                None => "info".to_string(),
                Some(raw) => EnvFilter::try_new(raw.trim())
                    .map(|_| raw.trim().to_string())
                    .map_err(|_| ConfigError::Invalid {
                        var: "RUST_LOG",
                        value: raw,
                    })?,
            },
            client_origin: match get("CLIENT_ORIGIN") {
                None => HeaderValue::from_static("http://localhost:5174"),
                Some(raw) => HeaderValue::from_str(raw.trim()).map_err(|_| {
                    ConfigError::Invalid {
                        var: "CLIENT_ORIGIN",
                        value: raw.clone(),
                    }
                })?,
            },
            request_timeout: Duration::from_secs(parse_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                10,
            )?),
            database_max_connections: parse_or(
                get("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
                5,
            )?,
        })
    }

    /// Builds the tracing filter for `log_level`.
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}
