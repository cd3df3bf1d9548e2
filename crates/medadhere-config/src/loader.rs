// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy (`./medadhere.toml`, `~/.config/medadhere/medadhere.toml`,
//! `/etc/medadhere/medadhere.toml`) with environment variable overrides via the
//! `MEDADHERE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MedAdhereConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/medadhere/medadhere.toml` (system-wide)
/// 3. `~/.config/medadhere/medadhere.toml` (user XDG config)
/// 4. `./medadhere.toml` (local directory)
/// 5. `MEDADHERE_*` environment variables
pub fn load_config() -> Result<MedAdhereConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<MedAdhereConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MedAdhereConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MedAdhereConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MedAdhereConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MedAdhereConfig::default()))
        .merge(Toml::file("/etc/medadhere/medadhere.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("medadhere/medadhere.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("medadhere.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")`: `MEDADHERE_SYNC_ENDPOINT_URL` must
/// map to `sync.endpoint_url`, not `sync.endpoint.url`.
fn env_provider() -> Env {
    Env::prefixed("MEDADHERE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 7] = [
        "app",
        "storage",
        "queue",
        "sync",
        "connectivity",
        "reminders",
        "prometheus",
    ];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
