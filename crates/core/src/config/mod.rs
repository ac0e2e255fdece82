//! Engine configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (NTRVW_*)
//! 2. TOML config file (if NTRVW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::quality::QualityWeights;

mod validation;

pub use validation::ConfigError;

/// Research-cache configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (NTRVW_*)
/// 2. TOML config file (if NTRVW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite research store.
    ///
    /// Set via NTRVW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Default reuse-eligibility window in days.
    ///
    /// Set via NTRVW_MAX_AGE_DAYS environment variable.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,

    /// Default minimum quality score for reuse.
    ///
    /// Set via NTRVW_MIN_QUALITY_SCORE environment variable.
    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: f64,

    /// Default cap on URLs returned per reuse lookup.
    ///
    /// Set via NTRVW_REUSE_LIMIT environment variable.
    #[serde(default = "default_reuse_limit")]
    pub reuse_limit: usize,

    /// Hard latency budget for the reuse lookup in milliseconds.
    ///
    /// Set via NTRVW_SELECTOR_TIMEOUT_MS environment variable.
    #[serde(default = "default_selector_timeout_ms")]
    pub selector_timeout_ms: u64,

    /// Quality-heuristic tuning.
    ///
    /// Nested fields use double underscores, e.g.
    /// NTRVW_QUALITY__BASE_SCORE.
    #[serde(default)]
    pub quality: QualityWeights,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./ntrvw-research.sqlite")
}

fn default_max_age_days() -> i64 {
    30
}

fn default_min_quality_score() -> f64 {
    0.3
}

fn default_reuse_limit() -> usize {
    20
}

fn default_selector_timeout_ms() -> u64 {
    5_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_age_days: default_max_age_days(),
            min_quality_score: default_min_quality_score(),
            reuse_limit: default_reuse_limit(),
            selector_timeout_ms: default_selector_timeout_ms(),
            quality: QualityWeights::default(),
        }
    }
}

impl AppConfig {
    /// Selector budget as a Duration for use with tokio timers.
    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `NTRVW_`
    /// 2. TOML file from `NTRVW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("NTRVW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("NTRVW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./ntrvw-research.sqlite"));
        assert_eq!(config.max_age_days, 30);
        assert!((config.min_quality_score - 0.3).abs() < 1e-9);
        assert_eq!(config.reuse_limit, 20);
        assert_eq!(config.selector_timeout_ms, 5_000);
        assert!((config.quality.base_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_selector_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.selector_timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_quality_weights_deserialize_partial() {
        // A config file can override a single weight and inherit the rest.
        let config: AppConfig =
            serde_json::from_str(r#"{"quality": {"base_score": 0.6}}"#).unwrap();
        assert!((config.quality.base_score - 0.6).abs() < 1e-9);
        assert_eq!(config.quality.floor_words, 20);
        assert_eq!(config.reuse_limit, 20);
    }
}
