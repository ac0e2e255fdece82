//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_age_days` is outside 1..=3650
    /// - `min_quality_score` is outside [0, 1]
    /// - `reuse_limit` is 0 or exceeds 100
    /// - `selector_timeout_ms` is less than 100ms or exceeds 1 minute
    /// - quality scores are outside [0, 1] or word thresholds are inverted
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_age_days < 1 {
            return Err(ConfigError::Invalid {
                field: "max_age_days".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.max_age_days > 3650 {
            return Err(ConfigError::Invalid {
                field: "max_age_days".into(),
                reason: "must not exceed 3650 days".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.min_quality_score) {
            return Err(ConfigError::Invalid {
                field: "min_quality_score".into(),
                reason: "must be within [0, 1]".into(),
            });
        }

        if self.reuse_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "reuse_limit".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.reuse_limit > 100 {
            return Err(ConfigError::Invalid {
                field: "reuse_limit".into(),
                reason: "must not exceed 100".into(),
            });
        }

        if self.selector_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "selector_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.selector_timeout_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "selector_timeout_ms".into(),
                reason: "must not exceed 1 minute (60000ms)".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.quality.base_score) {
            return Err(ConfigError::Invalid {
                field: "quality.base_score".into(),
                reason: "must be within [0, 1]".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.quality.floor_score) {
            return Err(ConfigError::Invalid {
                field: "quality.floor_score".into(),
                reason: "must be within [0, 1]".into(),
            });
        }
        if self.quality.floor_words > self.quality.short_words {
            return Err(ConfigError::Invalid {
                field: "quality.floor_words".into(),
                reason: "must not exceed quality.short_words".into(),
            });
        }
        if self.quality.long_words >= self.quality.very_long_words {
            return Err(ConfigError::Invalid {
                field: "quality.long_words".into(),
                reason: "must be less than quality.very_long_words".into(),
            });
        }

        if self.quality.primary_domains.is_empty() && self.quality.secondary_domains.is_empty() {
            tracing::warn!("no quality domain tiers configured; domain signal is disabled");
        }

        Ok(())
    }
}
