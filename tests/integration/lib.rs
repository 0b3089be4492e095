//! Shared fixtures for the integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gnoman_core::config::{BackendPreference, Config, ConfigBuilder, KdfConfig};
use gnoman_secrets::adapter::{self, AdapterSettings};
use gnoman_secrets::{AuditLedger, AuditSigner, EnvFileStore, SecretStore};
use tempfile::TempDir;

/// Cheap scrypt cost so backup tests stay fast.
pub const TEST_KDF: KdfConfig = KdfConfig::Scrypt {
    log_n: 10,
    r: 8,
    p: 1,
};

/// A state directory plus the config pointing into it.
///
/// Each [`Harness::open`] builds a fresh store the way the CLI does at
/// startup, so two calls behave like two separate processes.
pub struct Harness {
    pub dir: TempDir,
    pub config: Config,
    master_key: Option<Vec<u8>>,
}

impl Harness {
    pub fn new(backend: BackendPreference) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = test_config(dir.path(), backend);
        Self {
            dir,
            config,
            master_key: None,
        }
    }

    /// File adapter with values sealed under `key`.
    pub fn sealed(key: Vec<u8>) -> Self {
        let mut harness = Self::new(BackendPreference::File);
        harness.master_key = Some(key);
        harness
    }

    pub fn open(&self) -> SecretStore {
        let mut settings = AdapterSettings::from_config(&self.config).expect("adapter settings");
        settings.master_key = self.master_key.clone();
        let selection = adapter::select(&settings).expect("adapter selection");
        let signer = AuditSigner::resolve(selection.adapter.as_ref()).expect("audit signer");
        let ledger = Arc::new(AuditLedger::new(
            self.config.audit_log_path().expect("audit path"),
            signer,
        ));
        SecretStore::from_config(&self.config, selection.adapter, ledger).expect("secret store")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Direct handle on the plain env file, bypassing the store.
    pub fn env_file(&self) -> EnvFileStore {
        EnvFileStore::new(self.config.env.env_file.clone())
    }

    /// Direct handle on the secure env file, bypassing the store.
    pub fn secure_env_file(&self) -> EnvFileStore {
        EnvFileStore::new(self.path(".env.secure"))
    }
}

/// Config rooted at `dir`, env files included.
pub fn test_config(dir: &Path, backend: BackendPreference) -> Config {
    ConfigBuilder::new()
        .state_dir(dir)
        .backend(backend)
        .env_file(dir.join(".env"))
        .secure_env_file(Some(dir.join(".env.secure")))
        .kdf(TEST_KDF)
        .build()
}
