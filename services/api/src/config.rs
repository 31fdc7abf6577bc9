//! services/api/src/config.rs
//!
//! Defines the configuration for the API server and the terminal player.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use fitness_core::{ItemKind, PlayerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds the server configuration loaded at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level: log_level()?,
            cors_origin,
        })
    }
}

/// Configuration for the terminal player talking to a running server.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub session_id: String,
    pub kind: ItemKind,
    pub log_level: Level,
    pub player: PlayerConfig,
    pub tick_interval: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        let base_url =
            std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

        let session_id = std::env::var("SESSION_ID")
            .map_err(|_| ConfigError::MissingVar("SESSION_ID".to_string()))?;

        let kind_str = std::env::var("ITEM_KIND").unwrap_or_else(|_| "classes".to_string());
        let kind = ItemKind::from_path_segment(&kind_str).ok_or_else(|| {
            ConfigError::InvalidValue(
                "ITEM_KIND".to_string(),
                format!("'{}' is not one of programs, classes, challenges", kind_str),
            )
        })?;

        let tick_ms: u64 = parse_var("TICK_INTERVAL_MS", 1000)?;

        Ok(Self {
            base_url,
            session_id,
            kind,
            log_level: log_level()?,
            player: PlayerConfig {
                seconds_per_rep: parse_var("SECONDS_PER_REP", PlayerConfig::default().seconds_per_rep)?,
            },
            tick_interval: Duration::from_millis(tick_ms),
        })
    }
}

fn load_dotenv() {
    // Only load from .env in non-test mode to avoid contamination.
    if !cfg!(test) {
        dotenvy::dotenv().ok();
    }
}

fn log_level() -> Result<Level, ConfigError> {
    let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
    log_level_str.parse::<Level>().map_err(|_| {
        ConfigError::InvalidValue(
            "RUST_LOG".to_string(),
            format!("'{}' is not a valid log level", log_level_str),
        )
    })
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_and_rejects_garbage() {
        assert_eq!(parse_var::<u32>("FITNESS_TEST_UNSET_VAR", 2).unwrap(), 2);

        std::env::set_var("FITNESS_TEST_SECONDS_PER_REP", "three");
        let err = parse_var::<u32>("FITNESS_TEST_SECONDS_PER_REP", 2).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "FITNESS_TEST_SECONDS_PER_REP"));
    }
}
