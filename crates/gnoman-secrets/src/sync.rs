//! Drift detection and reconciliation across secret sources.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::crypto;
use crate::error::Result;
use crate::store::SecretStore;
use crate::types::{DriftReport, Metadata, Snapshot, Source};

/// How a reconciliation decision was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// The highest-priority source holding the key won.
    Priority,
    /// An operator picked the source.
    Manual,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Priority => "priority",
            SyncMode::Manual => "manual",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value propagated to every configured source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncAction {
    pub key: String,
    pub source: Source,
    pub mode: SyncMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Ok,
    Drift,
}

/// Per-key summary produced by [`SyncEngine::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretStatus {
    pub key: String,
    pub state: SyncState,
    pub sources: Vec<Source>,
    pub metadata: Option<Metadata>,
}

/// Reconciles the sources behind a [`SecretStore`].
pub struct SyncEngine<'a> {
    store: &'a SecretStore,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a SecretStore) -> Self {
        Self { store }
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let snapshot = self.store.snapshot()?;
        self.store.audit(
            "sync_snapshot",
            json!({}),
            true,
            json!({ "count": snapshot.len() }),
        )?;
        Ok(snapshot)
    }

    /// Keys whose values disagree across two or more sources.
    pub fn detect_drift(&self) -> Result<DriftReport> {
        let drift: DriftReport = self
            .store
            .snapshot()?
            .into_iter()
            .filter(|(_, values)| has_drift(values))
            .collect();
        let keys: Vec<&String> = drift.keys().collect();
        self.store
            .audit("sync_drift", json!({}), true, json!({ "keys": keys }))?;
        Ok(drift)
    }

    /// Propagate the highest-priority value of every key to all sources.
    pub fn force_sync(&self) -> Result<Vec<SyncAction>> {
        let configured = self.store.configured_sources();
        let mut actions = Vec::new();
        for (key, values) in self.store.snapshot()? {
            let Some((&source, value)) = values.iter().next() else {
                continue;
            };
            let consistent = configured
                .iter()
                .all(|s| values.get(s).is_some_and(|v| v == value));
            if consistent {
                continue;
            }
            actions.push(self.apply(&key, source, value, SyncMode::Priority)?);
        }
        info!(applied = actions.len(), "priority sync complete");
        Ok(actions)
    }

    /// Propagate the value held by the chosen source for each key.
    ///
    /// Decisions naming a source that does not hold the key are skipped and
    /// recorded as failed.
    pub fn apply_decisions(&self, decisions: &BTreeMap<String, Source>) -> Result<Vec<SyncAction>> {
        let mut actions = Vec::new();
        for (key, &source) in decisions {
            match self.store.read_source(source, key)? {
                Some(value) => actions.push(self.apply(key, source, &value, SyncMode::Manual)?),
                None => {
                    warn!(key = key.as_str(), %source, "decision names a source without a value");
                    self.store.audit(
                        "sync_apply",
                        json!({ "key": key, "source": source, "mode": SyncMode::Manual }),
                        false,
                        json!({ "reason": "source does not hold the key" }),
                    )?;
                }
            }
        }
        Ok(actions)
    }

    /// One row per known key with its sync state and provenance.
    pub fn status(&self) -> Result<Vec<SecretStatus>> {
        let records: Vec<SecretStatus> = self
            .store
            .snapshot()?
            .into_iter()
            .map(|(key, values)| SecretStatus {
                state: if has_drift(&values) {
                    SyncState::Drift
                } else {
                    SyncState::Ok
                },
                sources: values.keys().copied().collect(),
                metadata: self.store.metadata(&key),
                key,
            })
            .collect();
        let drifted = records
            .iter()
            .filter(|r| r.state == SyncState::Drift)
            .count();
        self.store.audit(
            "sync_list",
            json!({}),
            true,
            json!({ "count": records.len(), "drifted": drifted }),
        )?;
        Ok(records)
    }

    /// Replace `key` everywhere with a fresh hex value and return it.
    pub fn rotate_secret(&self, key: &str) -> Result<String> {
        let value = hex::encode(crypto::random_bytes(16));
        self.store.set(key, &value, true)?;
        self.store
            .audit("sync_rotate", json!({ "key": key }), true, json!({}))?;
        Ok(value)
    }

    pub fn remove_secret(&self, key: &str) -> Result<()> {
        self.store.delete(key)?;
        self.store
            .audit("sync_remove", json!({ "key": key }), true, json!({}))
    }

    fn apply(&self, key: &str, source: Source, value: &str, mode: SyncMode) -> Result<SyncAction> {
        self.store.set(key, value, true)?;
        self.store.audit(
            "sync_apply",
            json!({ "key": key, "source": source, "mode": mode }),
            true,
            json!({}),
        )?;
        Ok(SyncAction {
            key: key.to_string(),
            source,
            mode,
        })
    }
}

fn has_drift(values: &BTreeMap<Source, String>) -> bool {
    values.values().collect::<BTreeSet<_>>().len() > 1
}
