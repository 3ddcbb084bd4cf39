//! Database module for handling SQLite connections
//!
//! This module provides connection pooling, configuration, and health checks
//! for the relational store. Connecting at startup is retried with a fixed
//! delay so the service can come up before its database volume is ready.

use crate::error::{DatabaseError, DatabaseResult};
use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Database configuration struct
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL (`sqlite::memory:` for an in-memory database)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Pool acquire timeout in seconds
    pub acquire_timeout_seconds: u64,
    /// How many times a failed startup connection is retried
    pub connect_retries: u32,
    /// Fixed delay between startup connection attempts in seconds
    pub retry_delay_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://dinnerclub.db".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 30,
            connect_retries: 5,
            retry_delay_seconds: 5,
        }
    }
}

impl DatabaseConfig {
    /// In-memory configuration, used by tests
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            connect_retries: 0,
            ..Self::default()
        }
    }

    /// Whether the URL points at a private in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Initialize a SQLite connection pool
///
/// # Arguments
///
/// * `config` - Database configuration
///
/// # Returns
///
/// * `DatabaseResult<SqlitePool>` - connection pool, or the last connection
///   error once `connect_retries` is exhausted
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DatabaseError::Configuration(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut attempt = 0;
    loop {
        match pool_options(config).connect_with(options.clone()).await {
            Ok(pool) => {
                info!("Database connection pool initialized");
                return Ok(pool);
            }
            Err(e) if attempt < config.connect_retries => {
                attempt += 1;
                warn!(
                    "Error connecting to database (attempt {}/{}): {}",
                    attempt, config.connect_retries, e
                );
                tokio::time::sleep(Duration::from_secs(config.retry_delay_seconds)).await;
            }
            Err(e) => return Err(DatabaseError::Connection(e)),
        }
    }
}

fn pool_options(config: &DatabaseConfig) -> SqlitePoolOptions {
    let options = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

    // Every connection to `:memory:` opens its own database, so the pool
    // must hold exactly one connection for its whole lifetime.
    if config.is_in_memory() {
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options.max_connections(config.max_connections)
    }
}

/// Check database connectivity
///
/// # Arguments
///
/// * `pool` - SQLite connection pool
///
/// # Returns
///
/// * `DatabaseResult<bool>` - True if connection is successful
pub async fn health_check(pool: &SqlitePool) -> DatabaseResult<bool> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DatabaseError::Query)?;

    Ok(true)
}
