//! Wiring shared by every command that touches the trust store.

use std::sync::Arc;

use anyhow::Context as _;
use gnoman_core::{paths, Config};
use gnoman_secrets::adapter::{self, AdapterSelection, AdapterSettings};
use gnoman_secrets::{AdapterKind, AuditLedger, AuditSigner, SecretStore};
use serde_json::json;
use tracing::debug;

use crate::prompt::TerminalPrompter;

/// An opened trust store and the adapter decision behind it.
pub struct AppContext {
    pub config: Config,
    pub store: SecretStore,
    pub adapter_kind: AdapterKind,
    pub fallback_reason: Option<String>,
}

impl AppContext {
    /// Select the adapter for `config` and open the store on it.
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let settings = AdapterSettings::from_config(&config)?;
        let selection = adapter::select(&settings)?;
        Self::from_selection(config, selection)
    }

    /// Resolve the ledger signing key and open the store on an already
    /// selected adapter.
    ///
    /// A fallback from the native store is recorded in the ledger at warning
    /// severity, noting whether the replacement adapter seals its values.
    pub fn from_selection(config: Config, selection: AdapterSelection) -> anyhow::Result<Self> {
        config.validate()?;
        let state_dir = config.state_dir()?;
        paths::ensure_private_dir(&state_dir)
            .with_context(|| format!("creating state directory {}", state_dir.display()))?;

        let adapter_kind = selection.adapter.kind();
        let signer = AuditSigner::resolve(selection.adapter.as_ref())?;
        debug!(origin = ?signer.origin(), "audit signer ready");
        let ledger = Arc::new(AuditLedger::new(config.audit_log_path()?, signer));

        if let Some(reason) = &selection.fallback_reason {
            ledger.append(
                "adapter_fallback",
                json!({ "preferred": AdapterKind::Native.as_str(), "selected": adapter_kind.as_str() }),
                true,
                json!({
                    "severity": "warning",
                    "reason": reason,
                    "sealed": !selection.adapter.stores_plaintext(),
                }),
            )?;
        }

        let store = SecretStore::from_config(&config, selection.adapter.clone(), ledger)?
            .with_prompter(Box::new(TerminalPrompter));

        Ok(Self {
            config,
            store,
            adapter_kind,
            fallback_reason: selection.fallback_reason,
        })
    }
}
