// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sebar broadcast engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Sebar configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SebarConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WAHA messaging gateway settings.
    #[serde(default)]
    pub waha: WahaConfig,

    /// Worker loop and per-target pipeline settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Anti-detection pacing settings.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Campaign size and volume limits.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Recurring-broadcast scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Circuit breaker defaults for outbound channels.
    #[serde(default)]
    pub breaker: BreakerConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of this engine instance.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "sebar".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "sebar.db".to_string()
}

/// WAHA messaging gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WahaConfig {
    /// Base URL of the WAHA HTTP API.
    #[serde(default = "default_waha_base_url")]
    pub base_url: String,

    /// API key sent as `X-Api-Key`, if the gateway requires one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default session name used when a job does not specify a channel.
    #[serde(default = "default_waha_session")]
    pub session: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_waha_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WahaConfig {
    fn default() -> Self {
        Self {
            base_url: default_waha_base_url(),
            api_key: None,
            session: default_waha_session(),
            timeout_secs: default_waha_timeout_secs(),
        }
    }
}

fn default_waha_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_waha_session() -> String {
    "default".to_string()
}

fn default_waha_timeout_secs() -> u64 {
    60
}

/// Worker loop and per-target pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Idle sleep between claim attempts when no job is eligible, in seconds.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,

    /// Soft-lock lease taken when claiming a job, in seconds.
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: u64,

    /// Lease renewed immediately before a network send, in seconds.
    #[serde(default = "default_send_lease_secs")]
    pub send_lease_secs: u64,

    /// Backoff after an unexpected per-target error, in seconds.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Consecutive send failures that force a job into `paused`.
    #[serde(default = "default_max_failure_streak")]
    pub max_failure_streak: u32,

    /// Consecutive non-existent recipients that force a job into `paused`.
    #[serde(default = "default_max_missing_streak")]
    pub max_missing_streak: u32,

    /// Cool-down applied when the channel rate-limits us, in seconds.
    #[serde(default = "default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,

    /// Transient-failure retry attempts per send.
    #[serde(default = "default_send_retries")]
    pub send_retries: u32,

    /// Number of content variants generated per job.
    #[serde(default = "default_variant_count")]
    pub variant_count: usize,

    /// Fallback word for an empty `{name}` placeholder.
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
            claim_lease_secs: default_claim_lease_secs(),
            send_lease_secs: default_send_lease_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            max_failure_streak: default_max_failure_streak(),
            max_missing_streak: default_max_missing_streak(),
            rate_limit_cooldown_secs: default_rate_limit_cooldown_secs(),
            send_retries: default_send_retries(),
            variant_count: default_variant_count(),
            fallback_name: default_fallback_name(),
        }
    }
}

fn default_poll_secs() -> u64 {
    5
}

fn default_claim_lease_secs() -> u64 {
    60
}

fn default_send_lease_secs() -> u64 {
    120
}

fn default_error_backoff_secs() -> u64 {
    5
}

fn default_max_failure_streak() -> u32 {
    5
}

fn default_max_missing_streak() -> u32 {
    10
}

fn default_rate_limit_cooldown_secs() -> u64 {
    300
}

fn default_send_retries() -> u32 {
    3
}

fn default_variant_count() -> usize {
    10
}

fn default_fallback_name() -> String {
    "there".to_string()
}

/// Anti-detection pacing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PacingConfig {
    /// Whether randomized pacing delays are applied between sends.
    /// Disable only in development; production sends without pacing are
    /// trivially fingerprintable.
    #[serde(default = "default_pacing_enabled")]
    pub enabled: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: default_pacing_enabled(),
        }
    }
}

fn default_pacing_enabled() -> bool {
    true
}

/// Campaign size and volume limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Maximum targets accepted for a single job.
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,

    /// Maximum targets processed per tenant per day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_targets: default_max_targets(),
            daily_limit: default_daily_limit(),
        }
    }
}

fn default_max_targets() -> usize {
    500
}

fn default_daily_limit() -> u64 {
    1000
}

/// Recurring-broadcast scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Whether the scheduler loop runs at all.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Polling interval for due schedules, in seconds.
    #[serde(default = "default_scheduler_poll_secs")]
    pub poll_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            poll_secs: default_scheduler_poll_secs(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_scheduler_poll_secs() -> u64 {
    60
}

/// Circuit breaker defaults for outbound channel resources.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    /// Failures before the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the breaker stays open before allowing a trial call.
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_policy() {
        let config = SebarConfig::default();
        assert_eq!(config.engine.max_failure_streak, 5);
        assert_eq!(config.engine.max_missing_streak, 10);
        assert_eq!(config.engine.rate_limit_cooldown_secs, 300);
        assert_eq!(config.scheduler.poll_secs, 60);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert!(config.pacing.enabled);
    }

    #[test]
    fn config_serializes_round_trip() {
        let config = SebarConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SebarConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.name, config.agent.name);
        assert_eq!(parsed.broadcast.max_targets, config.broadcast.max_targets);
    }
}
