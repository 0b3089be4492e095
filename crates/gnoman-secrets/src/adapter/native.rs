//! Native secure store adapter (macOS Keychain, Windows Credential Manager,
//! Secret Service) on top of the `keyring` crate.
//!
//! The host APIs cannot enumerate credentials, so the adapter keeps a JSON
//! index of the `(namespace, key)` pairs it has written. The index holds no
//! values. It is reconciled lazily by [`NativeAdapter::list_entries`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use keyring::Entry;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{AdapterKind, PlatformAdapter};
use crate::error::{Result, SecretError};
use crate::fsutil;
use crate::types::SecretEntry;

/// Reserved entry used by the availability probe. It is only ever read.
const PROBE_NAMESPACE: &str = "__gnoman_probe__";
const PROBE_KEY: &str = "__gnoman_probe__";

type Index = BTreeMap<String, BTreeSet<String>>;

/// Adapter over the operating system credential store.
pub struct NativeAdapter {
    index_path: PathBuf,
    index_lock: Mutex<()>,
}

impl NativeAdapter {
    pub fn new(index_path: PathBuf) -> Self {
        Self {
            index_path,
            index_lock: Mutex::new(()),
        }
    }

    /// Read-only availability check.
    ///
    /// A present or absent probe entry both mean the store answered; any other
    /// outcome is [`SecretError::BackendUnavailable`].
    pub fn probe(&self) -> Result<()> {
        let entry = Entry::new(PROBE_NAMESPACE, PROBE_KEY)
            .map_err(|e| SecretError::BackendUnavailable(e.to_string()))?;
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretError::BackendUnavailable(e.to_string())),
        }
    }

    fn entry(namespace: &str, key: &str) -> Result<Entry> {
        Entry::new(namespace, key).map_err(|e| SecretError::Keyring(e.to_string()))
    }

    fn load_index(&self) -> Index {
        let content = match fs::read_to_string(&self.index_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Index::new(),
            Err(e) => {
                warn!(path = %self.index_path.display(), "unreadable keyring index: {e}");
                return Index::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.index_path.display(), "malformed keyring index: {e}");
            Index::new()
        })
    }

    fn save_index(&self, index: &Index) -> Result<()> {
        if index.is_empty() {
            return fsutil::remove_if_exists(&self.index_path);
        }
        let data = serde_json::to_vec_pretty(index)?;
        fsutil::write_atomic(&self.index_path, &data)
    }

    fn update_index(&self, f: impl FnOnce(&mut Index)) -> Result<()> {
        let _guard = self.index_lock.lock();
        let mut index = self.load_index();
        f(&mut index);
        self.save_index(&index)
    }
}

impl PlatformAdapter for NativeAdapter {
    fn list_entries(&self) -> Result<Vec<SecretEntry>> {
        let _guard = self.index_lock.lock();
        let mut index = self.load_index();
        let mut entries = Vec::new();
        let mut vanished = Vec::new();

        for (namespace, keys) in &index {
            for key in keys {
                match Self::entry(namespace, key)?.get_password() {
                    Ok(_) => entries.push(SecretEntry::new(namespace, key)),
                    Err(keyring::Error::NoEntry) => {
                        vanished.push((namespace.clone(), key.clone()))
                    }
                    Err(e) => return Err(SecretError::Keyring(e.to_string())),
                }
            }
        }

        if !vanished.is_empty() {
            debug!(count = vanished.len(), "pruning vanished keyring index entries");
            for (namespace, key) in vanished {
                if let Some(keys) = index.get_mut(&namespace) {
                    keys.remove(&key);
                    if keys.is_empty() {
                        index.remove(&namespace);
                    }
                }
            }
            self.save_index(&index)?;
        }

        Ok(entries)
    }

    fn get_secret(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        match Self::entry(namespace, key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SecretError::Keyring(e.to_string())),
        }
    }

    fn set_secret(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        Self::entry(namespace, key)?
            .set_password(value)
            .map_err(|e| SecretError::Keyring(e.to_string()))?;

        self.update_index(|index| {
            index
                .entry(namespace.to_string())
                .or_default()
                .insert(key.to_string());
        })
    }

    fn delete_secret(&self, namespace: &str, key: &str) -> Result<()> {
        match Self::entry(namespace, key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(SecretError::Keyring(e.to_string())),
        }

        self.update_index(|index| {
            if let Some(keys) = index.get_mut(namespace) {
                keys.remove(key);
                if keys.is_empty() {
                    index.remove(namespace);
                }
            }
        })
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Native
    }
}
