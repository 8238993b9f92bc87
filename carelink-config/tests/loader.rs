use std::collections::HashMap;
use std::time::Duration;

use carelink_config::{
    ConfigLoadError, ConfigLoader, EnvConfig, StorageBackend,
};
use tempfile::TempDir;

fn env(vars: &[(&str, &str)]) -> EnvConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvConfig::from_lookup(|name| vars.get(name).cloned())
}

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("carelink.toml");
    std::fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_apply_without_file_or_env() {
    let load = ConfigLoader::new()
        .with_env(env(&[]))
        .load()
        .expect("defaults load");

    assert_eq!(load.config.api.base_url.as_str(), "http://localhost:5000/api");
    assert_eq!(load.config.api.request_timeout, Duration::from_secs(30));
    assert_eq!(load.config.api.logout_timeout, Duration::from_secs(2));
    assert_eq!(load.config.storage.backend, StorageBackend::File);
    assert_eq!(load.config.storage.namespace, "carelink");
    assert!(load.config.source_path.is_none());
    assert!(
        load.warnings
            .items
            .iter()
            .any(|w| w.message.contains("No carelink.toml"))
    );
}

#[test]
fn file_values_are_used() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[api]
base_url = "https://clinic.example.org/api"
request_timeout = "45s"
health_timeout = "1s 500ms"

[storage]
backend = "memory"
path = "/tmp/carelink-ward7/session.json"
namespace = "ward7"
"#,
    );

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .with_env(env(&[]))
        .load()
        .expect("file config loads");

    let config = load.config;
    assert_eq!(config.api.base_url.host_str(), Some("clinic.example.org"));
    assert_eq!(config.api.request_timeout, Duration::from_secs(45));
    assert_eq!(config.api.health_timeout, Duration::from_millis(1500));
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert_eq!(config.storage.namespace, "ward7");
    assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
    assert!(load.warnings.is_empty());
}

#[test]
fn environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[api]
base_url = "https://file.example.org/api"

[storage]
path = "/var/lib/carelink/from-file.json"
"#,
    );

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .with_env(env(&[
            ("CARELINK_API_URL", "https://env.example.org/v2"),
            ("CARELINK_STORAGE_PATH", "/tmp/from-env.json"),
        ]))
        .load()
        .expect("config loads");

    assert_eq!(load.config.api.base_url.host_str(), Some("env.example.org"));
    assert_eq!(
        load.config.storage.path.as_deref(),
        Some(std::path::Path::new("/tmp/from-env.json"))
    );
}

#[test]
fn config_path_from_environment_must_exist() {
    let err = ConfigLoader::new()
        .with_env(env(&[("CARELINK_CONFIG", "/definitely/not/here.toml")]))
        .load()
        .expect_err("missing explicit config");

    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn invalid_values_are_rejected() {
    let err = ConfigLoader::new()
        .with_env(env(&[("CARELINK_REQUEST_TIMEOUT", "soon")]))
        .load()
        .expect_err("bad duration");
    assert!(matches!(
        err,
        ConfigLoadError::InvalidDuration {
            field: "request_timeout",
            ..
        }
    ));

    let err = ConfigLoader::new()
        .with_env(env(&[("CARELINK_API_URL", "ftp://clinic.example.org")]))
        .load()
        .expect_err("bad scheme");
    assert!(matches!(err, ConfigLoadError::UnsupportedScheme { .. }));

    let err = ConfigLoader::new()
        .with_env(env(&[("CARELINK_STORAGE", "redis")]))
        .load()
        .expect_err("bad backend");
    assert!(matches!(err, ConfigLoadError::UnknownStorageBackend { .. }));
}

#[test]
fn malformed_toml_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[api\nbase_url = ");

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .with_env(env(&[]))
        .load()
        .expect_err("parse error");

    match err {
        ConfigLoadError::Parse { path: reported, .. } => {
            assert_eq!(reported, path)
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn cleartext_remote_backend_warns() {
    let load = ConfigLoader::new()
        .with_env(env(&[("CARELINK_API_URL", "http://10.0.0.8:5000/api")]))
        .load()
        .expect("config loads");

    assert!(
        load.warnings
            .items
            .iter()
            .any(|w| w.message.contains("plain http"))
    );
}
