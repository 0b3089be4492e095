//! Process-local adapter for tests and ephemeral sessions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::{AdapterKind, PlatformAdapter};
use crate::error::Result;
use crate::types::SecretEntry;

struct Record {
    value: String,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

/// In-memory adapter. Nothing survives the process.
#[derive(Default)]
pub struct MemoryAdapter {
    records: Mutex<BTreeMap<(String, String), Record>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the modification time of an entry. Returns false if absent.
    pub fn set_modified(&self, namespace: &str, key: &str, modified: DateTime<Utc>) -> bool {
        let mut records = self.records.lock();
        match records.get_mut(&(namespace.to_string(), key.to_string())) {
            Some(record) => {
                record.modified = modified;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl PlatformAdapter for MemoryAdapter {
    fn list_entries(&self) -> Result<Vec<SecretEntry>> {
        let records = self.records.lock();
        Ok(records
            .iter()
            .map(|((namespace, key), record)| {
                let mut metadata = Map::new();
                metadata.insert("created".into(), Value::String(record.created.to_rfc3339()));
                metadata.insert(
                    "modified".into(),
                    Value::String(record.modified.to_rfc3339()),
                );
                SecretEntry::new(namespace, key).with_metadata(metadata)
            })
            .collect())
    }

    fn get_secret(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let records = self.records.lock();
        Ok(records
            .get(&(namespace.to_string(), key.to_string()))
            .map(|record| record.value.clone()))
    }

    fn set_secret(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let now = Utc::now();
        let mut records = self.records.lock();
        records
            .entry((namespace.to_string(), key.to_string()))
            .and_modify(|record| {
                record.value = value.to_string();
                record.modified = now;
            })
            .or_insert_with(|| Record {
                value: value.to_string(),
                created: now,
                modified: now,
            });
        Ok(())
    }

    fn delete_secret(&self, namespace: &str, key: &str) -> Result<()> {
        self.records
            .lock()
            .remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Memory
    }
}
