// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the MedAdhere offline sync core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level MedAdhere configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MedAdhereConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Offline action queue limits.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Remote sync target and replay settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Connectivity probe settings for the host process.
    #[serde(default)]
    pub connectivity: ConnectivityConfig,

    /// Medication reminder settings.
    #[serde(default)]
    pub reminders: RemindersConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Process-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
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

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("medadhere").join("medadhere.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("medadhere.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Offline action queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum number of pending actions. Appends beyond this fail with `StorageFull`.
    #[serde(default = "default_max_pending_actions")]
    pub max_pending_actions: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_pending_actions: default_max_pending_actions(),
        }
    }
}

fn default_max_pending_actions() -> usize {
    10_000
}

/// How a replay pass commits removals from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Remove actions only after the whole pending sequence was delivered.
    /// An aborted pass leaves the queue untouched and re-delivers its prefix later.
    #[default]
    AllOrNothing,
    /// Remove each confirmed prefix even when the pass aborts.
    ConfirmedPrefix,
}

/// Remote sync target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Endpoint that accepts one POSTed action per request.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Upper bound on a single delivery attempt, in seconds. Expiry is a failure.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Commit behavior for replay passes.
    #[serde(default)]
    pub commit_mode: CommitMode,

    /// Attempt a replay once at startup.
    #[serde(default = "default_replay_on_startup")]
    pub replay_on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            request_timeout_secs: default_request_timeout_secs(),
            commit_mode: CommitMode::default(),
            replay_on_startup: default_replay_on_startup(),
        }
    }
}

fn default_endpoint_url() -> String {
    "http://127.0.0.1:8080/api/sync".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_replay_on_startup() -> bool {
    true
}

/// Connectivity probe configuration.
///
/// The probe belongs to the host process; the sync core only consumes the
/// resulting online/offline signal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectivityConfig {
    /// Seconds between reachability probes of the sync endpoint.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Timeout for a single probe, in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_probe_interval_secs() -> u64 {
    15
}

fn default_probe_timeout_secs() -> u64 {
    5
}

/// Medication reminder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemindersConfig {
    /// Schedule daily reminders for medications that carry a `time`.
    #[serde(default = "default_reminders_enabled")]
    pub enabled: bool,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            enabled: default_reminders_enabled(),
        }
    }
}

fn default_reminders_enabled() -> bool {
    true
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Install the Prometheus recorder at startup.
    #[serde(default)]
    pub enabled: bool,
}
