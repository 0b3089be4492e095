//! A native-store fallback leaves a warning in the audit ledger.

use std::sync::Arc;

use gnoman_cli::context::AppContext;
use gnoman_core::config::BackendPreference;
use gnoman_integration_tests::Harness;
use gnoman_secrets::adapter::{AdapterSelection, FileAdapter, MemoryAdapter};
use gnoman_secrets::AdapterKind;

#[test]
fn test_fallback_is_logged_as_warning() {
    let harness = Harness::new(BackendPreference::Auto);
    let selection = AdapterSelection {
        adapter: Arc::new(FileAdapter::new(harness.path("keyring.json"), Some(vec![3u8; 32]))),
        fallback_reason: Some("secret service not running".to_string()),
    };

    let ctx = AppContext::from_selection(harness.config.clone(), selection).unwrap();
    assert_eq!(ctx.adapter_kind, AdapterKind::File);
    assert_eq!(ctx.fallback_reason.as_deref(), Some("secret service not running"));

    let ledger = ctx.store.ledger();
    let records = ledger.load_all().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.action, "adapter_fallback");
    assert_eq!(record.params["preferred"], "native");
    assert_eq!(record.params["selected"], "file");
    assert_eq!(record.result["severity"], "warning");
    assert_eq!(record.result["reason"], "secret service not running");
    assert_eq!(record.result["sealed"], true);
    assert_eq!(ledger.verify_log().unwrap(), 1);
}

#[test]
fn test_unsealed_fallback_is_flagged() {
    let harness = Harness::new(BackendPreference::Auto);
    let selection = AdapterSelection {
        adapter: Arc::new(FileAdapter::new(harness.path("keyring.json"), None)),
        fallback_reason: Some("no keyring".to_string()),
    };

    let ctx = AppContext::from_selection(harness.config.clone(), selection).unwrap();
    let record = ctx.store.ledger().read_tail(1).unwrap().pop().unwrap();
    assert_eq!(record.result["sealed"], false);
}

#[test]
fn test_no_record_without_fallback() {
    let harness = Harness::new(BackendPreference::Memory);
    let selection = AdapterSelection {
        adapter: Arc::new(MemoryAdapter::new()),
        fallback_reason: None,
    };

    let ctx = AppContext::from_selection(harness.config.clone(), selection).unwrap();
    assert!(ctx.store.ledger().load_all().unwrap().is_empty());
}

#[test]
fn test_reserved_namespace_is_refused() {
    let mut harness = Harness::new(BackendPreference::Memory);
    harness.config.keyring.service = "gnoman-audit".to_string();
    let selection = AdapterSelection {
        adapter: Arc::new(MemoryAdapter::new()),
        fallback_reason: None,
    };

    let err = AppContext::from_selection(harness.config.clone(), selection)
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("reserved"));
}
