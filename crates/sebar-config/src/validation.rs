// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, positive intervals, and sane
//! emergency-brake thresholds. Collects all errors instead of failing fast.

use crate::diagnostic::ConfigError;
use crate::model::SebarConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &SebarConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.waha.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "waha.base_url must not be empty".to_string(),
        });
    } else if !config.waha.base_url.starts_with("http://")
        && !config.waha.base_url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "waha.base_url must be an http(s) URL, got `{}`",
                config.waha.base_url
            ),
        });
    }

    if config.engine.poll_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.poll_secs must be at least 1".to_string(),
        });
    }

    if config.engine.claim_lease_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.claim_lease_secs must be at least 1".to_string(),
        });
    }

    if config.engine.max_failure_streak == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.max_failure_streak must be at least 1".to_string(),
        });
    }

    if config.engine.max_missing_streak == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.max_missing_streak must be at least 1".to_string(),
        });
    }

    if config.engine.variant_count == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.variant_count must be at least 1".to_string(),
        });
    }

    if config.broadcast.max_targets == 0 {
        errors.push(ConfigError::Validation {
            message: "broadcast.max_targets must be at least 1".to_string(),
        });
    }

    if config.scheduler.poll_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.poll_secs must be at least 1".to_string(),
        });
    }

    if config.breaker.failure_threshold == 0 {
        errors.push(ConfigError::Validation {
            message: "breaker.failure_threshold must be at least 1".to_string(),
        });
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of {valid_levels:?}, got `{}`",
                config.agent.log_level
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&SebarConfig::default()).is_ok());
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        let mut config = SebarConfig::default();
        config.engine.max_failure_streak = 0;
        config.breaker.failure_threshold = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let mut config = SebarConfig::default();
        config.waha.base_url = "localhost:3000".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("waha.base_url"));
    }

    #[test]
    fn all_errors_are_collected_not_fail_fast() {
        let mut config = SebarConfig::default();
        config.storage.database_path = "  ".to_string();
        config.engine.poll_secs = 0;
        config.agent.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
