//! Config save/load roundtrip integration tests.

use gnoman_core::config::{BackendPreference, Config, KdfConfig};
use gnoman_integration_tests::test_config;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gnoman.json5");

    let config = test_config(dir.path(), BackendPreference::File);
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.keyring.backend, BackendPreference::File);
    assert_eq!(loaded.keyring.service, config.keyring.service);
    assert_eq!(loaded.env.env_file, config.env.env_file);
    assert_eq!(loaded.backup.kdf, config.backup.kdf);
    assert_eq!(loaded.audit_log_path().unwrap(), config.audit_log_path().unwrap());
}

#[test]
fn test_config_json5_with_comments() {
    let config = Config::parse(
        r#"{
            // pbkdf2 for interoperability with older backups
            backup: { kdf: { algorithm: "pbkdf2-hmac-sha256", iterations: 390000 } },
            keyring: { backend: "memory" },
        }"#,
    )
    .unwrap();
    assert_eq!(config.backup.kdf, KdfConfig::Pbkdf2 { iterations: 390_000 });
    assert_eq!(config.keyring.backend, BackendPreference::Memory);
    assert_eq!(config.audit.stale_after_days, 180);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/gnoman.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    assert!(Config::parse("not valid json").is_err());
}
