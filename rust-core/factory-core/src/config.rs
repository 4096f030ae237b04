//! # Configuration
//!
//! Server and store settings with defaults, overridable from the environment.
//!
//! | Variable | Setting | Default |
//! |---|---|---|
//! | `FACTORY_ADDR` | bind address | `127.0.0.1:8000` |
//! | `FACTORY_KEEP_ALIVE` | HTTP/1 keep-alive | `true` |
//! | `FACTORY_SHUTDOWN_TIMEOUT_SECS` | graceful drain | `30` |
//! | `FACTORY_MAX_BODY_SIZE` | request body limit in bytes | `1048576` |
//! | `DATABASE_URL` | metadata store | required |
//! | `FACTORY_DB_MAX_CONNECTIONS` | pool size | driver default |
//! | `FACTORY_MIGRATE` | create the schema on startup | `false` |

use crate::error::{Error, Result};
use crate::types::parse_bool;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// HTTP Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Read overrides from the process environment
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` naming the variable that does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` naming the variable that does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            address: setting(&lookup, "FACTORY_ADDR")?.unwrap_or(defaults.address),
            keep_alive: flag(&lookup, "FACTORY_KEEP_ALIVE")?.unwrap_or(defaults.keep_alive),
            shutdown_timeout: setting(&lookup, "FACTORY_SHUTDOWN_TIMEOUT_SECS")?
                .map_or(defaults.shutdown_timeout, Duration::from_secs),
            max_body_size: setting(&lookup, "FACTORY_MAX_BODY_SIZE")?
                .unwrap_or(defaults.max_body_size),
        })
    }
}

/// Metadata store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `sqlite:` or `postgres://` connection URL
    pub database_url: String,
    /// Pool size; `None` keeps the driver default
    pub max_connections: Option<u32>,
    /// Create the four relations if they do not exist
    pub migrate: bool,
}

impl StoreConfig {
    /// Read the store settings from the process environment
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` when `DATABASE_URL` is missing or a
    /// variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the store settings through `lookup`
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` when `DATABASE_URL` is missing or a
    /// variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::Configuration("DATABASE_URL must be set".to_string()))?;

        Ok(Self {
            database_url,
            max_connections: setting(&lookup, "FACTORY_DB_MAX_CONNECTIONS")?,
            migrate: flag(&lookup, "FACTORY_MIGRATE")?.unwrap_or(false),
        })
    }
}

fn setting<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Configuration(format!("{key}={raw}: {e}"))),
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_bool(raw.trim())
            .map(Some)
            .ok_or_else(|| Error::Configuration(format!("{key}={raw}: not a boolean"))),
    }
}
