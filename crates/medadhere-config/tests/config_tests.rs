// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the MedAdhere configuration system.

use medadhere_config::diagnostic::ConfigError;
use medadhere_config::model::{CommitMode, MedAdhereConfig};
use medadhere_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_config() {
    let toml = r#"
[app]
log_level = "debug"

[storage]
database_path = "/tmp/medadhere-test.db"
wal_mode = false

[queue]
max_pending_actions = 50

[sync]
endpoint_url = "https://sync.example.org/api/sync"
request_timeout_secs = 10
commit_mode = "confirmed-prefix"
replay_on_startup = false

[connectivity]
probe_interval_secs = 30
probe_timeout_secs = 3

[reminders]
enabled = false

[prometheus]
enabled = true
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/medadhere-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.queue.max_pending_actions, 50);
    assert_eq!(config.sync.endpoint_url, "https://sync.example.org/api/sync");
    assert_eq!(config.sync.request_timeout_secs, 10);
    assert_eq!(config.sync.commit_mode, CommitMode::ConfirmedPrefix);
    assert!(!config.sync.replay_on_startup);
    assert_eq!(config.connectivity.probe_interval_secs, 30);
    assert_eq!(config.connectivity.probe_timeout_secs, 3);
    assert!(!config.reminders.enabled);
    assert!(config.prometheus.enabled);
}

/// Missing optional sections use defaults without error.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.app.log_level, "info");
    assert!(config.storage.wal_mode);
    assert!(config.storage.database_path.ends_with("medadhere.db"));
    assert_eq!(config.queue.max_pending_actions, 10_000);
    assert_eq!(config.sync.endpoint_url, "http://127.0.0.1:8080/api/sync");
    assert_eq!(config.sync.request_timeout_secs, 30);
    assert_eq!(config.sync.commit_mode, CommitMode::AllOrNothing);
    assert!(config.sync.replay_on_startup);
    assert!(config.reminders.enabled);
    assert!(!config.prometheus.enabled);
}

/// Unknown keys are rejected and reported with a suggestion and a source span.
#[test]
fn unknown_key_gets_suggestion_and_span() {
    let toml = r#"
[sync]
endpont_url = "https://sync.example.org"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key should be rejected");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(key, "endpont_url");
            assert_eq!(suggestion.as_deref(), Some("endpoint_url"));
            assert!(span.is_some(), "inline source should resolve a span");
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Unknown top-level sections are rejected too.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[sinc]
endpoint_url = "https://sync.example.org"
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("sinc"),
        "error should mention the unknown section, got: {err_str}"
    );
}

/// An unsupported commit mode is an invalid value, not a silent default.
#[test]
fn bad_commit_mode_is_rejected() {
    let toml = r#"
[sync]
commit_mode = "best-effort"
"#;

    let errors = load_and_validate_str(toml).expect_err("bad enum value should be rejected");
    assert!(
        errors[0].to_string().contains("sync.commit_mode")
            || errors[0].to_string().contains("best-effort"),
        "got: {}",
        errors[0]
    );
}

/// Wrong value types are reported as type errors.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[queue]
max_pending_actions = "lots"
"#;

    let errors = load_and_validate_str(toml).expect_err("string for usize should fail");
    assert!(
        matches!(errors[0], ConfigError::InvalidType { .. }),
        "got: {:?}",
        errors[0]
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_surface_through_load_and_validate() {
    let toml = r#"
[sync]
endpoint_url = "ftp://sync.example.org"
request_timeout_secs = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("validation should fail");
    assert_eq!(errors.len(), 2, "got: {errors:?}");
}

/// Dotted overrides (as produced by the env provider) reach nested keys.
#[test]
fn dotted_override_reaches_nested_key() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: MedAdhereConfig = Figment::new()
        .merge(Serialized::defaults(MedAdhereConfig::default()))
        .merge(Toml::string("[sync]\nrequest_timeout_secs = 12\n"))
        .merge(("sync.endpoint_url", "https://env.example.org/api/sync"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.sync.endpoint_url, "https://env.example.org/api/sync");
    assert_eq!(config.sync.request_timeout_secs, 12);
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_file_is_skipped() {
    let config = medadhere_config::load_config_from_path(std::path::Path::new(
        "/nonexistent/path/medadhere.toml",
    ))
    .expect("missing file should be silently skipped");
    assert_eq!(config.sync.request_timeout_secs, 30);
}

/// Defaults survive a serialize/deserialize pass through TOML.
#[test]
fn defaults_render_as_toml() {
    let rendered = toml::to_string(&MedAdhereConfig::default()).expect("defaults serialize");
    assert!(rendered.contains("commit_mode = \"all-or-nothing\""));
    let parsed = load_config_from_str(&rendered).expect("rendered defaults parse back");
    assert_eq!(parsed.sync.commit_mode, CommitMode::AllOrNothing);
}
