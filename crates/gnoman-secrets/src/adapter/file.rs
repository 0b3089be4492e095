//! File-backed adapter: one JSON document `{namespace: {key: value}}`.
//!
//! Used when no native secure store is reachable. The document is written
//! atomically with owner-only permissions. When a master key is configured
//! (`GNOMAN_MASTER_KEY`), values are sealed with AES-256-GCM under a per-value
//! HKDF-derived key before they touch the disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{AdapterKind, PlatformAdapter};
use crate::crypto;
use crate::error::{Result, SecretError};
use crate::fsutil;
use crate::types::SecretEntry;

type Document = BTreeMap<String, BTreeMap<String, String>>;

/// JSON-document adapter.
pub struct FileAdapter {
    path: PathBuf,
    master_key: Option<Zeroizing<Vec<u8>>>,
    lock: Mutex<()>,
}

impl FileAdapter {
    pub fn new(path: PathBuf, master_key: Option<Vec<u8>>) -> Self {
        Self {
            path,
            master_key: master_key.map(Zeroizing::new),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether values are sealed before they are written.
    pub fn is_encrypted(&self) -> bool {
        self.master_key.is_some()
    }

    fn read_document(&self) -> Result<Document> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Document::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads tolerate a damaged document so that lookups fall through to the
    /// env files instead of failing.
    fn read_document_lenient(&self) -> Document {
        self.read_document().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), "ignoring unreadable keyring file: {e}");
            Document::new()
        })
    }

    fn write_document(&self, document: &Document) -> Result<()> {
        if document.is_empty() {
            debug!(path = %self.path.display(), "keyring file empty, removing");
            return fsutil::remove_if_exists(&self.path);
        }
        let data = serde_json::to_vec_pretty(document)?;
        fsutil::write_atomic(&self.path, &data)
    }

    fn encode(&self, value: &str) -> Result<String> {
        match &self.master_key {
            Some(key) => crypto::seal_value(key, value),
            None => Ok(value.to_string()),
        }
    }

    fn decode(&self, stored: &str) -> Result<String> {
        if !crypto::is_sealed(stored) {
            return Ok(stored.to_string());
        }
        match &self.master_key {
            Some(key) => crypto::open_value(key, stored),
            None => Err(SecretError::Crypto(
                "value is sealed but no master key is configured".to_string(),
            )),
        }
    }
}

impl PlatformAdapter for FileAdapter {
    fn list_entries(&self) -> Result<Vec<SecretEntry>> {
        let _guard = self.lock.lock();
        let document = self.read_document_lenient();
        Ok(document
            .iter()
            .flat_map(|(namespace, keys)| {
                keys.keys().map(move |key| SecretEntry::new(namespace, key))
            })
            .collect())
    }

    fn get_secret(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        let document = self.read_document_lenient();
        document
            .get(namespace)
            .and_then(|keys| keys.get(key))
            .map(|stored| self.decode(stored))
            .transpose()
    }

    fn set_secret(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut document = self.read_document()?;
        let stored = self.encode(value)?;
        document
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), stored);
        self.write_document(&document)
    }

    fn delete_secret(&self, namespace: &str, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut document = self.read_document()?;
        let Some(keys) = document.get_mut(namespace) else {
            return Ok(());
        };
        if keys.remove(key).is_none() {
            return Ok(());
        }
        if keys.is_empty() {
            document.remove(namespace);
        }
        self.write_document(&document)
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::File
    }

    fn stores_plaintext(&self) -> bool {
        !self.is_encrypted()
    }
}
