use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use marscache::cache::BackendKind;
use marscache::config::{self, CliArgs, LoadError};
use serial_test::serial;
use uuid::Uuid;

const VARS: &[&str] = &[
    "MARSCACHE__CACHE__BACKEND",
    "MARSCACHE__CACHE__TTL_SECONDS",
    "MARSCACHE__SERVER__PORT",
    "MARSCACHE__UPSTREAM__API_KEY",
    "MARSCACHE_CONFIG_FILE",
    "NASA_API_KEY",
];

struct EnvGuard;

impl EnvGuard {
    fn set(pairs: &[(&str, &str)]) -> Self {
        clear();
        for (key, value) in pairs {
            // SAFETY: tests touching the environment run under #[serial].
            unsafe { std::env::set_var(key, value) };
        }
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        clear();
    }
}

fn clear() {
    for key in VARS {
        // SAFETY: tests touching the environment run under #[serial].
        unsafe { std::env::remove_var(key) };
    }
}

fn args(extra: &[&str]) -> CliArgs {
    CliArgs::parse_from(std::iter::once("marscache").chain(extra.iter().copied()))
}

fn write_config(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("marscache-{}.toml", Uuid::new_v4().simple()));
    fs::write(&path, contents).expect("config file should be writable");
    path
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    let _env = EnvGuard::set(&[
        ("MARSCACHE__CACHE__BACKEND", "shared"),
        ("MARSCACHE__CACHE__TTL_SECONDS", "120"),
        ("MARSCACHE__SERVER__PORT", "4444"),
    ]);

    let settings = config::load(&args(&[])).expect("settings");

    assert_eq!(settings.cache.backend, BackendKind::Shared);
    assert_eq!(settings.cache.ttl, Duration::from_secs(120));
    assert_eq!(settings.server.addr.port(), 4444);
}

#[test]
#[serial]
fn cli_overrides_environment() {
    let _env = EnvGuard::set(&[
        ("MARSCACHE__CACHE__BACKEND", "shared"),
        ("MARSCACHE__SERVER__PORT", "4444"),
    ]);

    let settings = config::load(&args(&["--cache-backend", "local", "--port", "5555"]))
        .expect("settings");

    assert_eq!(settings.cache.backend, BackendKind::Local);
    assert_eq!(settings.server.addr.port(), 5555);
}

#[test]
#[serial]
fn nasa_api_key_variable_feeds_the_cli_flag() {
    let _env = EnvGuard::set(&[
        ("MARSCACHE__UPSTREAM__API_KEY", "from-prefixed-env"),
        ("NASA_API_KEY", "from-nasa-env"),
    ]);

    let settings = config::load(&args(&[])).expect("settings");

    assert_eq!(settings.upstream.api_key, "from-nasa-env");
}

#[test]
#[serial]
fn config_file_is_overridden_by_environment() {
    let path = write_config(
        r#"
[cache]
backend = "shared"
ttl_seconds = 30

[upstream]
api_key = "from-file"
"#,
    );
    let _env = EnvGuard::set(&[("MARSCACHE__CACHE__TTL_SECONDS", "90")]);

    let settings = config::load(&args(&["--config-file", path.to_str().expect("utf-8 path")]));
    let _ = fs::remove_file(&path);
    let settings = settings.expect("settings");

    assert_eq!(settings.cache.backend, BackendKind::Shared);
    assert_eq!(settings.cache.ttl, Duration::from_secs(90));
    assert_eq!(settings.upstream.api_key, "from-file");
}

#[test]
#[serial]
fn missing_explicit_config_file_is_an_error() {
    let _env = EnvGuard::set(&[]);
    let path = std::env::temp_dir().join(format!("marscache-missing-{}.toml", Uuid::new_v4()));

    let result = config::load(&args(&["--config-file", path.to_str().expect("utf-8 path")]));

    assert!(matches!(result, Err(LoadError::Build(_))));
}

#[test]
#[serial]
fn invalid_environment_value_names_the_key() {
    let _env = EnvGuard::set(&[("MARSCACHE__CACHE__BACKEND", "memcached")]);

    match config::load(&args(&[])) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "cache.backend"),
        other => panic!("expected invalid backend, got {other:?}"),
    }
}
