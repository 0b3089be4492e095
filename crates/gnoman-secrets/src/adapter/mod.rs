//! Platform secret storage adapters.
//!
//! Every adapter stores `(namespace, key) -> value` triples and exposes the
//! same narrow contract through [`PlatformAdapter`]. Which adapter backs a
//! process is decided once by [`select`]: an explicit backend preference wins,
//! otherwise the native store is probed and the encrypted file adapter takes
//! over when the probe fails.

mod file;
mod memory;
mod native;

pub use file::FileAdapter;
pub use memory::MemoryAdapter;
pub use native::NativeAdapter;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use gnoman_core::config::BackendPreference;
use gnoman_core::Config;
use tracing::{debug, warn};

use crate::crypto;
use crate::error::{Result, SecretError};
use crate::types::SecretEntry;

/// Storage contract shared by every adapter.
///
/// Missing entries are not errors: `get_secret` returns `Ok(None)` and
/// `delete_secret` does nothing.
pub trait PlatformAdapter: Send + Sync {
    /// Every stored `(namespace, key)` pair, without values.
    fn list_entries(&self) -> Result<Vec<SecretEntry>>;

    /// Value for `(namespace, key)`, if present.
    fn get_secret(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Create or replace the value for `(namespace, key)`.
    fn set_secret(&self, namespace: &str, key: &str, value: &str) -> Result<()>;

    /// Remove `(namespace, key)`.
    fn delete_secret(&self, namespace: &str, key: &str) -> Result<()>;

    /// Which adapter this is.
    fn kind(&self) -> AdapterKind;

    /// Whether values reach persistent storage unencrypted.
    fn stores_plaintext(&self) -> bool {
        false
    }
}

/// Adapter variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Native,
    File,
    Memory,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything [`select`] needs, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub preference: BackendPreference,
    pub file_path: PathBuf,
    pub native_index_path: PathBuf,
    pub master_key: Option<Vec<u8>>,
}

impl AdapterSettings {
    /// Resolve paths from `config` and the file master key from the environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let file_path = config
            .keyring_file_path()
            .map_err(|e| SecretError::Validation(e.to_string()))?;
        let native_index_path = config
            .native_index_path()
            .map_err(|e| SecretError::Validation(e.to_string()))?;

        Ok(Self {
            preference: config.keyring.backend,
            file_path,
            native_index_path,
            master_key: crypto::master_key_from_env()?,
        })
    }
}

/// The chosen adapter, plus why the native store was skipped (if it was).
pub struct AdapterSelection {
    pub adapter: Arc<dyn PlatformAdapter>,
    pub fallback_reason: Option<String>,
}

impl fmt::Debug for AdapterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterSelection")
            .field("adapter", &self.adapter.kind())
            .field("fallback_reason", &self.fallback_reason)
            .finish()
    }
}

/// Pick the adapter for this process.
///
/// `Auto` probes the native store with a read-only lookup of a reserved
/// entry. A probe failure is recovered here: the file adapter is returned and
/// the reason is reported in [`AdapterSelection::fallback_reason`].
pub fn select(settings: &AdapterSettings) -> Result<AdapterSelection> {
    let file_adapter = || -> Arc<dyn PlatformAdapter> {
        Arc::new(FileAdapter::new(
            settings.file_path.clone(),
            settings.master_key.clone(),
        ))
    };

    let selection = match settings.preference {
        BackendPreference::Memory => AdapterSelection {
            adapter: Arc::new(MemoryAdapter::new()),
            fallback_reason: None,
        },
        BackendPreference::File => AdapterSelection {
            adapter: file_adapter(),
            fallback_reason: None,
        },
        BackendPreference::Native => {
            let native = NativeAdapter::new(settings.native_index_path.clone());
            native.probe()?;
            AdapterSelection {
                adapter: Arc::new(native),
                fallback_reason: None,
            }
        }
        BackendPreference::Auto => {
            let native = NativeAdapter::new(settings.native_index_path.clone());
            match native.probe() {
                Ok(()) => AdapterSelection {
                    adapter: Arc::new(native),
                    fallback_reason: None,
                },
                Err(e) => {
                    warn!("native secure store unavailable, using file adapter: {e}");
                    AdapterSelection {
                        adapter: file_adapter(),
                        fallback_reason: Some(e.to_string()),
                    }
                }
            }
        }
    };

    if selection.adapter.stores_plaintext() {
        warn!(
            path = %settings.file_path.display(),
            "no master key configured, file adapter values are stored unencrypted (set GNOMAN_MASTER_KEY)"
        );
    }
    debug!(adapter = %selection.adapter.kind(), "selected secret adapter");
    Ok(selection)
}
