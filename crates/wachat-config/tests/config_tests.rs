// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the wachat configuration system.

use std::io::Write;

use wachat_config::diagnostic::ConfigError;
use wachat_config::model::WachatConfig;
use wachat_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_wachat_config() {
    let toml = r#"
[app]
name = "inbox-worker"
log_level = "debug"

[storage]
database_path = "/tmp/wachat-test.db"
wal_mode = false

[backend]
base_url = "https://fastwapi.example.com/api"
api_key = "secret-token"
timeout_secs = 10

[sync]
request_delay_ms = 250

[ingest]
queue_capacity = 32
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.name, "inbox-worker");
    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/wachat-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.backend.base_url, "https://fastwapi.example.com/api");
    assert_eq!(config.backend.api_key.as_deref(), Some("secret-token"));
    assert_eq!(config.backend.timeout_secs, 10);
    assert_eq!(config.sync.request_delay_ms, 250);
    assert_eq!(config.ingest.queue_capacity, 32);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.app.name, "wachat");
    assert_eq!(config.app.log_level, "info");
    assert!(config.storage.database_path.ends_with("wachat.db"));
    assert!(config.storage.wal_mode);
    assert!(config.backend.api_key.is_none());
    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.sync.request_delay_ms, 100);
    assert_eq!(config.ingest.queue_capacity, 256);
}

/// Dotted overrides (what the env provider produces) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let toml_content = r#"
[backend]
api_key = "from-toml"
"#;

    let config: WachatConfig = Figment::new()
        .merge(Serialized::defaults(WachatConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("backend.api_key", "from-env"))
        .merge(("sync.request_delay_ms", 5))
        .extract()
        .expect("should merge override");

    assert_eq!(config.backend.api_key.as_deref(), Some("from-env"));
    assert_eq!(config.sync.request_delay_ms, 5);
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: WachatConfig = Figment::new()
        .merge(Serialized::defaults(WachatConfig::default()))
        .merge(Toml::file("/nonexistent/path/wachat.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.app.name, "wachat");
}

/// Unknown top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[realtime]
url = "wss://relay"
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("realtime"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// A typo in [backend] yields an UnknownKey diagnostic with a suggestion.
#[test]
fn diagnostic_base_ulr_suggests_base_url() {
    let toml = r#"
[backend]
base_ulr = "http://localhost"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "base_ulr"
                && suggestion.as_deref() == Some("base_url")
                && valid_keys.contains("timeout_secs")
        })
    });
    assert!(found, "expected UnknownKey for base_ulr, got: {errors:?}");
}

/// A string where a number is expected is reported as a type error.
#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[sync]
request_delay_ms = "soon"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "expected InvalidType, got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_rejects_zero_timeout() {
    let toml = r#"
[backend]
timeout_secs = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero timeout should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("timeout_secs"))
    ));
}

/// ConfigError renders through miette with code and help.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "base_ulr".to_string(),
        suggestion: Some("base_url".to_string()),
        valid_keys: "base_url, api_key, timeout_secs".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `base_url`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("base_ulr"));
}

/// An explicit config file is loaded and validated.
#[test]
fn explicit_path_is_loaded() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(file, "[app]\nname = \"from-file\"").unwrap();

    let config = load_and_validate_path(file.path()).expect("file should load");
    assert_eq!(config.app.name, "from-file");
}
