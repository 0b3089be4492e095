//! Ledger integrity across processes and under tampering.

use std::fs;

use gnoman_core::config::BackendPreference;
use gnoman_integration_tests::Harness;
use gnoman_secrets::{GetOptions, SecretError};

fn populated() -> Harness {
    let harness = Harness::new(BackendPreference::File);
    let store = harness.open();
    store.set("A", "alpha-value", true).unwrap();
    store.set("B", "bravo-value", false).unwrap();
    drop(store);

    // A second process appends to the same chain with the same key.
    let store = harness.open();
    store.get("A", &GetOptions::new()).unwrap();
    store.delete("B").unwrap();
    harness
}

#[test]
fn test_chain_verifies_across_processes() {
    let harness = populated();
    let store = harness.open();
    assert_eq!(store.ledger().verify_log().unwrap(), 4);

    let records = store.ledger().load_all().unwrap();
    assert_eq!(records[0].previous_hash, "");
    for pair in records.windows(2) {
        assert_eq!(pair[1].previous_hash, pair[0].hash);
    }
}

#[test]
fn test_signing_key_is_stable() {
    let harness = populated();
    let first = harness.open().ledger().signer().public_key_hex();
    let second = harness.open().ledger().signer().public_key_hex();
    assert_eq!(first, second);
}

#[test]
fn test_edited_record_fails_verification() {
    let harness = populated();
    let store = harness.open();
    let path = store.ledger().path().to_path_buf();

    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, content.replacen("\"key\":\"B\"", "\"key\":\"C\"", 1)).unwrap();

    assert!(store.ledger().verify_log().is_err());
    let records = store.ledger().load_all().unwrap();
    assert!(!store.ledger().verify(&records));
}

#[test]
fn test_removed_record_breaks_the_chain() {
    let harness = populated();
    let store = harness.open();
    let path = store.ledger().path().to_path_buf();

    let lines: Vec<String> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let kept: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, l)| l.as_str())
        .collect();
    fs::write(&path, kept.join("\n") + "\n").unwrap();

    let records = store.ledger().load_all().unwrap();
    assert!(store.ledger().verify(&records));
    let err = store.ledger().verify_chain(&records).unwrap_err();
    assert!(matches!(err, SecretError::ChainIntegrity { index: 1, .. }));
}

#[test]
fn test_tail_returns_latest_records() {
    let harness = populated();
    let tail = harness.open().ledger().read_tail(2).unwrap();
    let actions: Vec<&str> = tail.iter().map(|r| r.action.as_str()).collect();
    assert_eq!(actions, vec!["secret_get", "secret_delete"]);
}
