// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, non-empty paths, and non-zero timeouts.

use crate::diagnostic::ConfigError;
use crate::model::MedAdhereConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MedAdhereConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.app.log_level.to_ascii_lowercase().as_str()) {
        invalid(format!(
            "app.log_level `{}` must be one of: {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if config.queue.max_pending_actions == 0 {
        invalid("queue.max_pending_actions must be at least 1".to_string());
    }

    let url = config.sync.endpoint_url.trim();
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match host {
        None => invalid(format!(
            "sync.endpoint_url `{url}` must start with http:// or https://"
        )),
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            invalid(format!("sync.endpoint_url `{url}` has no host"))
        }
        Some(_) => {}
    }

    if config.sync.request_timeout_secs == 0 {
        invalid("sync.request_timeout_secs must be greater than 0".to_string());
    }

    if config.connectivity.probe_interval_secs == 0 {
        invalid("connectivity.probe_interval_secs must be greater than 0".to_string());
    }

    if config.connectivity.probe_timeout_secs == 0 {
        invalid("connectivity.probe_timeout_secs must be greater than 0".to_string());
    } else if config.connectivity.probe_timeout_secs > config.connectivity.probe_interval_secs {
        invalid(format!(
            "connectivity.probe_timeout_secs ({}) must not exceed probe_interval_secs ({})",
            config.connectivity.probe_timeout_secs, config.connectivity.probe_interval_secs
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
