//! Test plan for the `parley-config` crate.
//!
//! Exercises the configuration loader across default handling, file
//! discovery, and environment overrides.

use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use parley_config::load;

const ENV_VARS_TO_RESET: &[&str] = &[
    "PARLEY_CONFIG",
    "PARLEY__DATABASE__MAX_CONNECTIONS",
    "PARLEY__DATABASE__URL",
    "PARLEY__HTTP__ADDRESS",
    "PARLEY__HTTP__PORT",
    "PARLEY__REALTIME__TYPING_TTL_SECONDS",
    "PARLEY__REALTIME__TYPING_SWEEP_INTERVAL_SECONDS",
];

fn reset_environment() {
    for key in ENV_VARS_TO_RESET {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn load_uses_defaults_without_file_or_env() {
    reset_environment();

    let config = load().expect("defaults should load");

    assert_eq!(config.http.port, 5050);
    assert_eq!(config.realtime.typing_ttl_seconds, 10);
    assert_eq!(config.realtime.typing_sweep_interval_seconds, 5);
}

#[test]
#[serial]
fn environment_overrides_take_precedence() {
    reset_environment();
    std::env::set_var("PARLEY__HTTP__PORT", "9999");
    std::env::set_var("PARLEY__REALTIME__TYPING_TTL_SECONDS", "30");

    let config = load().expect("env overrides should load");

    assert_eq!(config.http.port, 9999);
    assert_eq!(config.realtime.typing_ttl_seconds, 30);

    reset_environment();
}

#[test]
#[serial]
fn explicit_config_file_is_honoured() {
    reset_environment();

    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("parley.toml");
    fs::write(
        &path,
        r#"
[http]
address = "0.0.0.0"
port = 8080

[database]
url = "sqlite://custom.db"
max_connections = 3

[realtime]
typing_ttl_seconds = 20
"#,
    )
    .expect("write config file");

    std::env::set_var("PARLEY_CONFIG", &path);

    let config = load().expect("file config should load");

    assert_eq!(config.http.address, "0.0.0.0");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.database.url, "sqlite://custom.db");
    assert_eq!(config.database.max_connections, 3);
    assert_eq!(config.realtime.typing_ttl_seconds, 20);
    // Unset fields fall back to defaults.
    assert_eq!(config.realtime.typing_sweep_interval_seconds, 5);

    reset_environment();
}
