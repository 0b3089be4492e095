//! Provenance index for stored secrets.
//!
//! Persisted as a JSON array of `{service, username, metadata}` objects in
//! its own file. The index is advisory: every mutation is best-effort, and a
//! failure to persist it is logged and never fails the secret operation that
//! triggered it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SecretError;
use crate::fsutil;
use crate::types::{Metadata, SecretEntry, Source};

#[derive(Serialize, Deserialize)]
struct IndexRecord {
    service: String,
    username: String,
    #[serde(default)]
    metadata: Metadata,
}

type Records = BTreeMap<(String, String), Metadata>;

/// File-backed metadata index with a lazily loaded cache.
pub struct MetadataIndex {
    path: PathBuf,
    cache: Mutex<Option<Records>>,
}

impl MetadataIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a write of `(namespace, key)` into `source`.
    pub fn touch_write(&self, namespace: &str, key: &str, source: Source) {
        let now = Utc::now();
        self.mutate(|records| {
            let meta = records
                .entry((namespace.to_string(), key.to_string()))
                .or_default();
            meta.created.get_or_insert(now);
            meta.modified = Some(now);
            meta.sources.insert(source);
        });
    }

    /// Record a read of `(namespace, key)`.
    pub fn touch_read(&self, namespace: &str, key: &str) {
        let now = Utc::now();
        self.mutate(|records| {
            records
                .entry((namespace.to_string(), key.to_string()))
                .or_default()
                .last_accessed = Some(now);
        });
    }

    /// Forget `(namespace, key)`.
    pub fn remove(&self, namespace: &str, key: &str) {
        self.mutate(|records| {
            records.remove(&(namespace.to_string(), key.to_string()));
        });
    }

    /// Recorded metadata for `(namespace, key)`, if the index knows it.
    pub fn get(&self, namespace: &str, key: &str) -> Option<Metadata> {
        self.with_records(|records| {
            records
                .get(&(namespace.to_string(), key.to_string()))
                .cloned()
        })
    }

    /// Keys recorded under `namespace`, sorted.
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        self.with_records(|records| {
            records
                .keys()
                .filter(|(ns, _)| ns == namespace)
                .map(|(_, key)| key.clone())
                .collect()
        })
    }

    /// Re-create the index from an adapter enumeration.
    ///
    /// Known metadata for surviving entries is kept; entries the adapter no
    /// longer holds are dropped.
    pub fn rebuild(&self, entries: &[SecretEntry]) {
        self.mutate(|records| {
            let mut rebuilt = Records::new();
            for entry in entries {
                let id = (entry.namespace.clone(), entry.key.clone());
                let mut meta = records.remove(&id).unwrap_or_default();
                meta.sources.insert(Source::Adapter);
                rebuilt.insert(id, meta);
            }
            *records = rebuilt;
        });
        debug!(count = entries.len(), "metadata index rebuilt");
    }

    fn load(&self) -> Records {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Records::new(),
            Err(e) => {
                warn!(path = %self.path.display(), "unreadable metadata index: {e}");
                return Records::new();
            }
        };
        match serde_json::from_str::<Vec<IndexRecord>>(&content) {
            Ok(list) => list
                .into_iter()
                .map(|r| ((r.service, r.username), r.metadata))
                .collect(),
            Err(e) => {
                warn!(path = %self.path.display(), "malformed metadata index: {e}");
                Records::new()
            }
        }
    }

    fn with_records<T>(&self, f: impl FnOnce(&Records) -> T) -> T {
        let mut cache = self.cache.lock();
        let records = cache.get_or_insert_with(|| self.load());
        f(records)
    }

    fn mutate(&self, f: impl FnOnce(&mut Records)) {
        let mut cache = self.cache.lock();
        let records = cache.get_or_insert_with(|| self.load());
        f(records);

        let list: Vec<IndexRecord> = records
            .iter()
            .map(|((service, username), metadata)| IndexRecord {
                service: service.clone(),
                username: username.clone(),
                metadata: metadata.clone(),
            })
            .collect();
        let persisted = serde_json::to_vec_pretty(&list)
            .map_err(SecretError::from)
            .and_then(|data| fsutil::write_atomic(&self.path, &data));
        if let Err(e) = persisted {
            warn!(path = %self.path.display(), "failed to persist metadata index: {e}");
        }
    }
}
