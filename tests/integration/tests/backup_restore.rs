//! Backup export, passphrase rotation and restore into a fresh store.

use gnoman_core::config::BackendPreference;
use gnoman_integration_tests::{Harness, TEST_KDF};
use gnoman_secrets::backup::{read_envelope, write_envelope};
use gnoman_secrets::{BackupCodec, GetOptions, SecretError};

fn exported_backup(harness: &Harness) -> std::path::PathBuf {
    let store = harness.open();
    store.set("RPC_URL", "https://rpc.example", false).unwrap();
    store.set("PRIVATE_KEY", "0xabc123", false).unwrap();

    let entries = store.export_entries().unwrap();
    let envelope = BackupCodec::new(TEST_KDF)
        .save(&entries, "correct horse battery staple")
        .unwrap();
    let path = harness.path("backups/backup.json");
    write_envelope(&path, &envelope).unwrap();
    path
}

#[test]
fn test_restore_into_fresh_store() {
    let source = Harness::new(BackendPreference::File);
    let path = exported_backup(&source);

    let codec = BackupCodec::new(TEST_KDF);
    let entries = codec
        .load(&read_envelope(&path).unwrap(), "correct horse battery staple")
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.namespace == "gnoman"));

    let target = Harness::new(BackendPreference::File);
    let store = target.open();
    store.import_entries(&entries, false).unwrap();
    assert_eq!(
        store.get("PRIVATE_KEY", &GetOptions::new()).unwrap().as_deref(),
        Some("0xabc123")
    );
    assert_eq!(
        store.get("RPC_URL", &GetOptions::new()).unwrap().as_deref(),
        Some("https://rpc.example")
    );
}

#[test]
fn test_wrong_passphrase_is_rejected() {
    let harness = Harness::new(BackendPreference::File);
    let path = exported_backup(&harness);
    let err = BackupCodec::new(TEST_KDF)
        .load(&read_envelope(&path).unwrap(), "wrong")
        .unwrap_err();
    assert!(matches!(err, SecretError::InvalidPassphraseOrCorruptBackup));
}

#[test]
fn test_tampered_backup_is_rejected() {
    let harness = Harness::new(BackendPreference::File);
    let path = exported_backup(&harness);

    let mut envelope = read_envelope(&path).unwrap();
    let mut chars: Vec<char> = envelope.ciphertext.chars().collect();
    chars[4] = if chars[4] == 'A' { 'B' } else { 'A' };
    envelope.ciphertext = chars.into_iter().collect();

    let err = BackupCodec::new(TEST_KDF)
        .load(&envelope, "correct horse battery staple")
        .unwrap_err();
    assert!(matches!(err, SecretError::InvalidPassphraseOrCorruptBackup));
}

#[test]
fn test_rotate_file_passphrase() {
    let harness = Harness::new(BackendPreference::File);
    let path = exported_backup(&harness);
    let codec = BackupCodec::new(TEST_KDF);

    codec
        .rotate_file(&path, "correct horse battery staple", "new passphrase")
        .unwrap();

    let envelope = read_envelope(&path).unwrap();
    assert!(matches!(
        codec.load(&envelope, "correct horse battery staple"),
        Err(SecretError::InvalidPassphraseOrCorruptBackup)
    ));
    assert_eq!(codec.load(&envelope, "new passphrase").unwrap().len(), 2);
}

#[test]
fn test_missing_backup_file() {
    let harness = Harness::new(BackendPreference::File);
    let err = read_envelope(&harness.path("nope.json")).unwrap_err();
    assert!(matches!(err, SecretError::NotFound(_)));
}
