//! Engine configuration loaded from disk

use remedy_core::LogFormat;
use remedy_playbook::{ConfigError, EngineConfig, RepoAllowlist};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn loads_and_compiles_file() {
    let file = write_config(
        r#"
lawbook_version = "2024-05"

[retry]
max_retries = 2
base_delay_ms = 500
max_delay_ms = 4000
jitter_factor = 0.0

[allowlist]
repos = ["acme/api", "acme-infra/*"]

[log]
format = "json"
filter = "remedy_playbook=debug"
"#,
    );

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.lawbook_version, "2024-05");
    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.log.format, LogFormat::Json);

    let allowlist = config.allowlist().unwrap();
    assert!(allowlist.is_allowed("acme", "api").await.unwrap());
    assert!(allowlist.is_allowed("acme-infra", "network").await.unwrap());
    assert!(!allowlist.is_allowed("acme", "web").await.unwrap());
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn invalid_entry_in_file_is_rejected() {
    let file = write_config("[allowlist]\nrepos = [\"acme\"]\n");
    let err = EngineConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidAllowlistEntry { .. }));
}

#[test]
fn empty_file_uses_defaults() {
    let file = write_config("");
    assert_eq!(EngineConfig::from_file(file.path()).unwrap(), EngineConfig::default());
}
