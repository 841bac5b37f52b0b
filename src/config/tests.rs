//! Configuration tests
//!
//! These tests serve as compile-time guards to ensure all config fields are
//! properly serialized. When you add a new field, these tests will fail until
//! you update to_toml() and the file-config structs.

use super::*;

/// Round-trip the default config through TOML and verify every field survives
#[test]
fn default_config_roundtrips_through_toml() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let file: FileConfig = toml::from_str(&toml_str).expect("generated TOML must parse");
    let reloaded = Config::from_parts(file);

    assert_eq!(reloaded.api_url, config.api_url);
    assert_eq!(reloaded.request_timeout_secs, config.request_timeout_secs);
    assert_eq!(reloaded.logging.level, config.logging.level);
    assert_eq!(reloaded.logging.file_enabled, config.logging.file_enabled);
    assert_eq!(reloaded.logging.file_dir, config.logging.file_dir);
    assert_eq!(reloaded.logging.file_rotation, config.logging.file_rotation);
    assert_eq!(reloaded.logging.file_prefix, config.logging.file_prefix);
    assert_eq!(
        reloaded.assistant.suggestion_limit,
        config.assistant.suggestion_limit
    );
}

/// Non-default values must also survive serialization
#[test]
fn custom_config_roundtrips_through_toml() {
    let config = Config {
        api_url: "https://crm.example.com".to_string(),
        request_timeout_secs: 30,
        enable_tui: true,
        logging: LoggingConfig {
            level: "debug".to_string(),
            file_enabled: true,
            file_dir: PathBuf::from("/tmp/corral-logs"),
            file_rotation: LogRotation::Hourly,
            file_prefix: "crm".to_string(),
        },
        assistant: AssistantConfig {
            suggestion_limit: 8,
        },
    };

    let file: FileConfig = toml::from_str(&config.to_toml()).expect("generated TOML must parse");
    let reloaded = Config::from_parts(file);

    assert_eq!(reloaded.api_url, config.api_url);
    assert_eq!(reloaded.request_timeout_secs, 30);
    assert_eq!(reloaded.logging.level, "debug");
    assert!(reloaded.logging.file_enabled);
    assert_eq!(reloaded.logging.file_dir, PathBuf::from("/tmp/corral-logs"));
    assert_eq!(reloaded.logging.file_rotation, LogRotation::Hourly);
    assert_eq!(reloaded.logging.file_prefix, "crm");
    assert_eq!(reloaded.assistant.suggestion_limit, 8);
}

#[test]
fn log_rotation_parses_known_and_unknown_values() {
    assert_eq!(LogRotation::parse("hourly"), LogRotation::Hourly);
    assert_eq!(LogRotation::parse("Daily"), LogRotation::Daily);
    assert_eq!(LogRotation::parse("NEVER"), LogRotation::Never);
    assert_eq!(LogRotation::parse("weekly"), LogRotation::Daily);
    assert_eq!(LogRotation::parse(""), LogRotation::Daily);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let file: FileConfig = toml::from_str("api_url = \"http://localhost:9999\"").unwrap();
    let config = Config::from_parts(file);

    assert_eq!(config.api_url, "http://localhost:9999");
    assert_eq!(config.request_timeout_secs, 120);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.assistant.suggestion_limit, 4);
}

#[test]
fn empty_file_config_yields_defaults() {
    let file: FileConfig = toml::from_str("").unwrap();
    let config = Config::from_parts(file);
    let defaults = Config::default();

    assert_eq!(config.api_url, defaults.api_url);
    assert_eq!(config.request_timeout_secs, defaults.request_timeout_secs);
}
