//! Database connection pool configuration

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use insightiq_core::{InsightResult, StoreError};
use std::time::Duration;
use tokio_postgres::NoTls;

/// Database connection pool configuration.
///
/// Environment variables:
/// - `INSIGHTIQ_DB_HOST` (default: "localhost")
/// - `INSIGHTIQ_DB_PORT` (default: 5432)
/// - `INSIGHTIQ_DB_NAME` (default: "chinook")
/// - `INSIGHTIQ_DB_USER` (default: "postgres")
/// - `INSIGHTIQ_DB_PASSWORD` (default: empty)
/// - `INSIGHTIQ_DB_POOL_SIZE` (default: 8)
/// - `INSIGHTIQ_DB_TIMEOUT` (seconds, default: 30)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_size: usize,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "chinook".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 8,
            timeout: Duration::from_secs(30),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("INSIGHTIQ_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("INSIGHTIQ_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("INSIGHTIQ_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("INSIGHTIQ_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("INSIGHTIQ_DB_PASSWORD").unwrap_or(defaults.password),
            max_size: std::env::var("INSIGHTIQ_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: Duration::from_secs(
                std::env::var("INSIGHTIQ_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> InsightResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::Pool {
                reason: format!("Failed to create pool: {}", e),
            })?;

        Ok(pool)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "chinook");
        assert_eq!(config.max_size, 8);
    }

    #[test]
    fn test_create_pool_from_default() {
        // Pool creation is lazy; no server needs to be listening.
        let config = StoreConfig::default();
        assert!(config.create_pool().is_ok());
    }

    #[test]
    fn test_pool_honors_configured_size() {
        let config = StoreConfig {
            max_size: 3,
            ..StoreConfig::default()
        };
        let pool = config.create_pool().unwrap();
        assert_eq!(pool.status().max_size, 3);
    }
}
