use justbackoff::config::{BackoffConfig, ConfigError};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[test]
fn save_then_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.yaml");
    let cfg = BackoffConfig {
        min_ms: 250.0,
        max_ms: 30_000.0,
        factor: 1.5,
        jitter: true,
    };
    cfg.save(&path).unwrap();

    let loaded = BackoffConfig::load(Some(&path)).unwrap();
    assert_eq!(loaded, cfg);
}

#[test]
#[cfg(unix)]
fn saved_file_is_private() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    BackoffConfig::default().save(&path).unwrap();
    let meta = fs::metadata(&path).unwrap();
    assert_eq!(meta.permissions().mode() & 0o777, 0o600);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = BackoffConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "factor: [not, a, number]\n").unwrap();
    let err = BackoffConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn config_path_is_vendorless() {
    let path = BackoffConfig::config_path().unwrap();
    let s = path.display().to_string();
    assert!(s.contains("justbackoff"));
    assert!(s.ends_with("config.yaml"));
}

#[test]
fn built_backoff_follows_file_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "min_ms: 10000\nmax_ms: 1000\n").unwrap();
    let mut b = BackoffConfig::from_file(&path).unwrap().build();
    assert_eq!(b.duration(), 1.0);
    assert_eq!(b.duration(), 1.0);
}
