//! Drift detection and reconciliation against real env files.

use std::collections::BTreeMap;

use gnoman_core::config::BackendPreference;
use gnoman_integration_tests::Harness;
use gnoman_secrets::{Source, SyncEngine, SyncMode};

fn drifted_harness() -> Harness {
    let harness = Harness::new(BackendPreference::File);
    let store = harness.open();
    store.set("SHARED", "adapter-value", true).unwrap();
    drop(store);

    harness.env_file().set("SHARED", "edited-by-hand").unwrap();
    harness.secure_env_file().set("ENV_ONLY", "secure-value").unwrap();
    harness.env_file().set("ENV_ONLY", "plain-value").unwrap();
    harness
}

#[test]
fn test_drift_is_detected() {
    let harness = drifted_harness();
    let store = harness.open();
    let drift = SyncEngine::new(&store).detect_drift().unwrap();

    assert_eq!(drift.len(), 2);
    assert_eq!(drift["SHARED"][&Source::Adapter], "adapter-value");
    assert_eq!(drift["SHARED"][&Source::Env], "edited-by-hand");
    assert!(!drift["ENV_ONLY"].contains_key(&Source::Adapter));
}

#[test]
fn test_priority_reconciliation() {
    let harness = drifted_harness();
    let store = harness.open();
    let engine = SyncEngine::new(&store);
    let actions = engine.force_sync().unwrap();

    let sources: BTreeMap<_, _> = actions.iter().map(|a| (a.key.clone(), a.source)).collect();
    assert_eq!(sources["SHARED"], Source::Adapter);
    assert_eq!(sources["ENV_ONLY"], Source::SecureEnv);
    assert!(engine.detect_drift().unwrap().is_empty());

    // The next process sees the reconciled files.
    let reopened = harness.open();
    let snapshot = reopened.snapshot().unwrap();
    assert!(snapshot["SHARED"].values().all(|v| v == "adapter-value"));
    assert_eq!(snapshot["ENV_ONLY"].len(), 3);
    assert_eq!(
        harness.env_file().get("ENV_ONLY").unwrap().as_deref(),
        Some("secure-value")
    );
}

#[test]
fn test_manual_decision_overrides_priority() {
    let harness = drifted_harness();
    let store = harness.open();
    let mut decisions = BTreeMap::new();
    decisions.insert("SHARED".to_string(), Source::Env);

    let actions = SyncEngine::new(&store).apply_decisions(&decisions).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].mode, SyncMode::Manual);

    let snapshot = store.snapshot().unwrap();
    assert!(snapshot["SHARED"].values().all(|v| v == "edited-by-hand"));

    let applies: Vec<_> = store
        .ledger()
        .load_all()
        .unwrap()
        .into_iter()
        .filter(|r| r.action == "sync_apply")
        .collect();
    assert_eq!(applies.len(), 1);
    assert_eq!(applies[0].params["mode"], "manual");
}
