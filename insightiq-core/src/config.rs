//! Engine configuration

use crate::error::{ConfigError, InsightResult};
use std::time::Duration;

/// Tunables for the query generation loop.
///
/// Environment variables:
/// - `INSIGHTIQ_MAX_ATTEMPTS`: total generation attempts per question (default: 3)
/// - `INSIGHTIQ_RETRY_DELAY_MS`: pause between failed attempts (default: 2000)
/// - `INSIGHTIQ_MAX_RELEVANT_TABLES`: retrieval cut-off (default: 5)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Total generation attempts before giving up. Bounds latency and cost.
    pub max_attempts: u32,
    /// Pause between failed attempts, to avoid hammering the model endpoint.
    pub retry_delay: Duration,
    /// How many tables to ask the semantic index for.
    pub max_relevant_tables: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            max_relevant_tables: 5,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("INSIGHTIQ_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            retry_delay: std::env::var("INSIGHTIQ_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            max_relevant_tables: std::env::var("INSIGHTIQ_MAX_RELEVANT_TABLES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_relevant_tables),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> InsightResult<()> {
        if self.max_attempts < 1 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts".to_string(),
                value: self.max_attempts.to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.max_relevant_tables < 1 {
            return Err(ConfigError::InvalidValue {
                field: "max_relevant_tables".to_string(),
                value: self.max_relevant_tables.to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Test-friendly configuration: default budget, no inter-attempt delay.
    pub fn without_delay() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
