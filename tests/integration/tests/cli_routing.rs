//! CLI parsing and command routing against a throwaway state directory.

use clap::Parser;
use gnoman_cli::{run, Cli, Commands};
use gnoman_core::config::BackendPreference;
use gnoman_integration_tests::Harness;
use gnoman_secrets::GetOptions;

fn invoke(harness: &Harness, args: &[&str]) -> Result<(), String> {
    let mut argv = vec!["gnoman"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).map_err(|e| e.to_string())?;
    run(cli, harness.config.clone()).map_err(|e| format!("{e:#}"))
}

#[test]
fn test_every_command_group_parses() {
    for args in [
        vec!["gnoman", "secrets", "list"],
        vec!["gnoman", "secrets", "report", "--json"],
        vec!["gnoman", "sync", "drift"],
        vec!["gnoman", "sync", "force"],
        vec!["gnoman", "sync", "status"],
        vec!["gnoman", "backup", "export"],
        vec!["gnoman", "backup", "rotate-passphrase", "b.json"],
        vec!["gnoman", "audit", "verify"],
        vec!["gnoman", "audit", "pubkey"],
        vec!["gnoman", "sync", "rotate", "API_KEY"],
        vec!["gnoman", "sync", "remove", "API_KEY"],
        vec!["gnoman", "keyring", "list"],
        vec!["gnoman", "keyring", "reindex"],
        vec!["gnoman", "config", "validate"],
    ] {
        assert!(Cli::try_parse_from(args.clone()).is_ok(), "failed to parse {args:?}");
    }
}

#[test]
fn test_unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["gnoman", "gateway", "run"]).is_err());
}

#[test]
fn test_set_then_verify_ledger() {
    let harness = Harness::new(BackendPreference::File);
    invoke(&harness, &["secrets", "set", "API_KEY", "--value", "value-123"]).unwrap();
    invoke(&harness, &["secrets", "rotate", "API_KEY", "--length", "16"]).unwrap();
    invoke(&harness, &["sync", "force"]).unwrap();
    invoke(&harness, &["audit", "verify"]).unwrap();

    let value = harness
        .open()
        .get("API_KEY", &GetOptions::new())
        .unwrap()
        .unwrap();
    assert_ne!(value, "value-123");
}

#[test]
fn test_set_writes_env_files_by_default() {
    let harness = Harness::new(BackendPreference::File);
    invoke(&harness, &["secrets", "set", "K", "--value", "v"]).unwrap();
    assert_eq!(harness.env_file().get("K").unwrap().as_deref(), Some("v"));
    assert_eq!(harness.secure_env_file().get("K").unwrap().as_deref(), Some("v"));

    invoke(&harness, &["secrets", "set", "ADAPTER_ONLY", "--value", "w", "--no-env"]).unwrap();
    assert_eq!(harness.env_file().get("ADAPTER_ONLY").unwrap(), None);
    assert_eq!(harness.secure_env_file().get("ADAPTER_ONLY").unwrap(), None);
    assert_eq!(
        harness
            .open()
            .get("ADAPTER_ONLY", &GetOptions::new())
            .unwrap()
            .as_deref(),
        Some("w")
    );
}

#[test]
fn test_sync_rotate_and_remove_route() {
    let harness = Harness::new(BackendPreference::File);
    invoke(&harness, &["secrets", "set", "K", "--value", "before"]).unwrap();
    invoke(&harness, &["sync", "rotate", "K"]).unwrap();
    let rotated = harness.env_file().get("K").unwrap().unwrap();
    assert_ne!(rotated, "before");
    assert_eq!(rotated.len(), 32);

    invoke(&harness, &["sync", "remove", "K"]).unwrap();
    assert!(harness.open().snapshot().unwrap().get("K").is_none());
}

#[test]
fn test_keyring_reindex_routes() {
    let harness = Harness::new(BackendPreference::File);
    invoke(&harness, &["secrets", "set", "K", "--value", "v", "--no-env"]).unwrap();
    std::fs::remove_file(harness.config.metadata_index_path().unwrap()).unwrap();

    invoke(&harness, &["keyring", "reindex"]).unwrap();
    assert!(harness.open().metadata("K").is_some());
}

#[test]
fn test_missing_secret_is_an_error() {
    let harness = Harness::new(BackendPreference::File);
    let err = invoke(&harness, &["secrets", "get", "NOPE"]).unwrap_err();
    assert!(err.contains("NOPE"));
}

#[test]
fn test_backup_roundtrip_through_cli() {
    let source = Harness::new(BackendPreference::File);
    invoke(&source, &["secrets", "set", "K", "--value", "kept"]).unwrap();
    let path = source.path("out.json");
    let path_str = path.to_str().unwrap();
    invoke(&source, &["backup", "export", path_str, "--passphrase", "pw-1"]).unwrap();

    let target = Harness::new(BackendPreference::File);
    invoke(&target, &["backup", "import", path_str, "--passphrase", "pw-1"]).unwrap();
    assert_eq!(
        target.open().get("K", &GetOptions::new()).unwrap().as_deref(),
        Some("kept")
    );

    let err = invoke(&target, &["backup", "import", path_str, "--passphrase", "wrong"]).unwrap_err();
    assert!(err.contains("passphrase"));
}

#[test]
fn test_version_routes() {
    let cli = Cli::try_parse_from(["gnoman", "version"]).unwrap();
    assert!(matches!(cli.command, Commands::Version));
}
