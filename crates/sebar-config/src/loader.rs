// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sebar.toml` > `~/.config/sebar/sebar.toml` >
//! `/etc/sebar/sebar.toml` with environment variable overrides via the
//! `SEBAR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SebarConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sebar/sebar.toml` (system-wide)
/// 3. `~/.config/sebar/sebar.toml` (user XDG config)
/// 4. `./sebar.toml` (local directory)
/// 5. `SEBAR_*` environment variables
pub fn load_config() -> Result<SebarConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SebarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SebarConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SebarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SebarConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SebarConfig::default()))
        .merge(Toml::file("/etc/sebar/sebar.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sebar/sebar.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sebar.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SEBAR_ENGINE_MAX_FAILURE_STREAK` must map
/// to `engine.max_failure_streak`, not `engine.max.failure.streak`.
fn env_provider() -> Env {
    Env::prefixed("SEBAR_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("waha_", "waha.", 1)
            .replacen("engine_", "engine.", 1)
            .replacen("pacing_", "pacing.", 1)
            .replacen("broadcast_", "broadcast.", 1)
            .replacen("scheduler_", "scheduler.", 1)
            .replacen("breaker_", "breaker.", 1);
        mapped.into()
    })
}
