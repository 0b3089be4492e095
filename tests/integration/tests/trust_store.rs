//! End-to-end store behaviour across adapter reopenings.

use gnoman_core::config::BackendPreference;
use gnoman_integration_tests::Harness;
use gnoman_secrets::{GetOptions, SecretError, Source};

#[test]
fn test_value_survives_reopen() {
    let harness = Harness::new(BackendPreference::File);
    harness.open().set("RPC_URL", "https://rpc.example/v1", false).unwrap();

    let store = harness.open();
    assert_eq!(
        store.get("RPC_URL", &GetOptions::new()).unwrap().as_deref(),
        Some("https://rpc.example/v1")
    );
    let meta = store.metadata("RPC_URL").unwrap();
    assert!(meta.created.is_some());
    assert!(meta.sources.contains(&Source::Adapter));
}

#[test]
fn test_sealed_values_survive_reopen() {
    let harness = Harness::sealed(vec![7u8; 32]);
    harness.open().set("PRIVATE_KEY", "0xdeadbeefcafe", false).unwrap();

    let raw = std::fs::read_to_string(harness.path("keyring.json")).unwrap();
    assert!(!raw.contains("0xdeadbeefcafe"));
    assert!(raw.contains("gnoman:v1:"));

    assert_eq!(
        harness
            .open()
            .get("PRIVATE_KEY", &GetOptions::new())
            .unwrap()
            .as_deref(),
        Some("0xdeadbeefcafe")
    );
}

#[test]
fn test_one_entry_per_key() {
    let harness = Harness::new(BackendPreference::File);
    let store = harness.open();
    store.set("TOKEN", "first", false).unwrap();
    store.set("TOKEN", "second", false).unwrap();

    let entries: Vec<_> = store
        .adapter()
        .list_entries()
        .unwrap()
        .into_iter()
        .filter(|e| e.namespace == store.namespace())
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "TOKEN");
    assert!(entries[0].value.is_none());
}

#[test]
fn test_env_fallback_and_persist() {
    let harness = Harness::new(BackendPreference::Memory);
    harness.env_file().set("FROM_ENV", "plain-value").unwrap();

    let store = harness.open();
    assert_eq!(
        store.get("FROM_ENV", &GetOptions::new()).unwrap().as_deref(),
        Some("plain-value")
    );

    store.set("PERSISTED", "mirrored", true).unwrap();
    assert_eq!(
        harness.env_file().get("PERSISTED").unwrap().as_deref(),
        Some("mirrored")
    );
    assert_eq!(
        harness.secure_env_file().get("PERSISTED").unwrap().as_deref(),
        Some("mirrored")
    );
}

#[test]
fn test_require_missing() {
    let harness = Harness::new(BackendPreference::Memory);
    let err = harness
        .open()
        .require("ABSENT", &GetOptions::new())
        .unwrap_err();
    assert!(matches!(err, SecretError::MissingSecret(_)));
}

#[test]
fn test_secret_values_never_reach_the_ledger() {
    let harness = Harness::new(BackendPreference::File);
    let store = harness.open();
    store.set("API_TOKEN", "sk-live-1234567890", true).unwrap();
    store.get("API_TOKEN", &GetOptions::new()).unwrap();
    store.rotate(None, 24).unwrap();
    store.export_entries().unwrap();

    let ledger = std::fs::read_to_string(store.ledger().path()).unwrap();
    assert!(!ledger.contains("sk-live-1234567890"));
    assert!(ledger.contains("sk**************90"));
}

#[test]
fn test_rotation_changes_only_requested_keys() {
    let harness = Harness::new(BackendPreference::File);
    let store = harness.open();
    store.set("ROTATE_ME", "aaaaaaaa", true).unwrap();
    store.set("LEAVE_ME", "bbbbbbbb", true).unwrap();

    let rotated = store.rotate(Some(&["ROTATE_ME".to_string()]), 32).unwrap();
    assert_eq!(rotated, 1);

    let snapshot = store.snapshot().unwrap();
    assert!(snapshot["ROTATE_ME"].values().all(|v| v != "aaaaaaaa"));
    assert!(snapshot["LEAVE_ME"].values().all(|v| v == "bbbbbbbb"));
    assert_eq!(
        harness.env_file().get("ROTATE_ME").unwrap(),
        Some(snapshot["ROTATE_ME"][&Source::Adapter].clone())
    );
}
