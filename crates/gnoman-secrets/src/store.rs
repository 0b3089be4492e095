//! The trust store facade.
//!
//! [`SecretStore`] resolves a key across the platform adapter, the secure
//! env file and the plain env file, writes through to every location, keeps
//! the metadata index current, and records each operation in the audit
//! ledger. Secret values never reach the ledger; `set` records a redacted
//! preview only.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gnoman_core::{Config, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::adapter::PlatformAdapter;
use crate::audit::{AuditLedger, AUDIT_NAMESPACE};
use crate::crypto;
use crate::envfile::EnvFileStore;
use crate::error::{Result, SecretError};
use crate::metadata::MetadataIndex;
use crate::types::{Metadata, SecretEntry, Snapshot, Source};

/// Interactive input used when a lookup misses every source.
pub trait Prompter: Send + Sync {
    /// Ask for a value. `Ok(None)` means the user declined.
    fn prompt(&self, message: &str, sensitive: bool) -> Result<Option<SecretString>>;
}

/// Options for [`SecretStore::get`] and [`SecretStore::require`].
#[derive(Debug, Clone)]
pub struct GetOptions {
    pub prompt_on_miss: bool,
    pub prompt_text: Option<String>,
    pub sensitive: bool,
    pub default: Option<String>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            prompt_on_miss: false,
            prompt_text: None,
            sensitive: true,
            default: None,
        }
    }
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt_on_miss(mut self, prompt: bool) -> Self {
        self.prompt_on_miss = prompt;
        self
    }

    pub fn prompt_text(mut self, text: impl Into<String>) -> Self {
        self.prompt_text = Some(text.into());
        self
    }

    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Summary of adapter contents, as produced by [`SecretStore::health_report`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthReport {
    pub total: usize,
    /// `namespace/key` labels seen more than once in the enumeration.
    pub duplicates: Vec<String>,
    /// Namespaces holding an entry with an empty key.
    pub missing_keys: Vec<String>,
    /// `namespace/key` labels not modified within the threshold.
    pub stale: Vec<String>,
}

/// Multi-source secret store.
pub struct SecretStore {
    namespace: String,
    adapter: Arc<dyn PlatformAdapter>,
    metadata: MetadataIndex,
    env: EnvFileStore,
    secure_env: Option<EnvFileStore>,
    ledger: Arc<AuditLedger>,
    prompter: Option<Box<dyn Prompter>>,
}

impl SecretStore {
    pub fn new(
        namespace: impl Into<String>,
        adapter: Arc<dyn PlatformAdapter>,
        metadata: MetadataIndex,
        env: EnvFileStore,
        secure_env: Option<EnvFileStore>,
        ledger: Arc<AuditLedger>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            adapter,
            metadata,
            env,
            secure_env,
            ledger,
            prompter: None,
        }
    }

    /// Build a store over the locations named in `config`.
    pub fn from_config(
        config: &Config,
        adapter: Arc<dyn PlatformAdapter>,
        ledger: Arc<AuditLedger>,
    ) -> Result<Self> {
        if config.keyring.service == AUDIT_NAMESPACE {
            return Err(SecretError::Validation(format!(
                "namespace '{AUDIT_NAMESPACE}' is reserved for the audit signing key"
            )));
        }
        let index_path = config
            .metadata_index_path()
            .map_err(|e| SecretError::Validation(e.to_string()))?;
        Ok(Self::new(
            config.keyring.service.clone(),
            adapter,
            MetadataIndex::new(index_path),
            EnvFileStore::new(config.env.env_file.clone()),
            config.env.secure_env_file.clone().map(EnvFileStore::new),
            ledger,
        ))
    }

    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn adapter(&self) -> &Arc<dyn PlatformAdapter> {
        &self.adapter
    }

    pub fn ledger(&self) -> &Arc<AuditLedger> {
        &self.ledger
    }

    /// Sources this store can read and write, in priority order.
    pub fn configured_sources(&self) -> Vec<Source> {
        let mut sources = vec![Source::Adapter];
        if self.secure_env.is_some() {
            sources.push(Source::SecureEnv);
        }
        sources.push(Source::Env);
        sources
    }

    /// Value held by `source`, ignoring empty values.
    pub fn read_source(&self, source: Source, key: &str) -> Result<Option<String>> {
        let value = match source {
            Source::Adapter => self.adapter.get_secret(&self.namespace, key)?,
            Source::SecureEnv => match &self.secure_env {
                Some(store) => store.get(key)?,
                None => None,
            },
            Source::Env => self.env.get(key)?,
        };
        Ok(value.filter(|v| !v.is_empty()))
    }

    /// Resolve `key`: adapter, secure env, plain env, prompt, then default.
    pub fn get(&self, key: &str, options: &GetOptions) -> Result<Option<String>> {
        for source in self.configured_sources() {
            if let Some(value) = self.read_source(source, key)? {
                self.metadata.touch_read(&self.namespace, key);
                self.ledger.append(
                    "secret_get",
                    json!({ "key": key }),
                    true,
                    json!({ "source": source }),
                )?;
                return Ok(Some(value));
            }
        }

        if options.prompt_on_miss {
            if let Some(value) = self.prompt_for(key, options)? {
                return Ok(Some(value));
            }
        }

        if let Some(default) = &options.default {
            self.ledger.append(
                "secret_get",
                json!({ "key": key }),
                true,
                json!({ "source": "default" }),
            )?;
            return Ok(Some(default.clone()));
        }

        self.ledger
            .append("secret_missing", json!({ "key": key }), false, json!({}))?;
        Ok(None)
    }

    fn prompt_for(&self, key: &str, options: &GetOptions) -> Result<Option<String>> {
        let Some(prompter) = &self.prompter else {
            debug!(key, "no prompter configured");
            return Ok(None);
        };
        let message = options
            .prompt_text
            .clone()
            .unwrap_or_else(|| format!("Enter value for {key}"));
        let Some(answer) = prompter.prompt(&message, options.sensitive)? else {
            return Ok(None);
        };
        let value = answer.trimmed();
        if value.is_empty() {
            return Ok(None);
        }

        let written = self.write_value(key, value.expose_secret(), true)?;
        self.ledger.append(
            "secret_prompt",
            json!({ "key": key }),
            true,
            json!({ "sources": written }),
        )?;
        Ok(Some(value.expose_secret().to_string()))
    }

    /// Like [`get`](Self::get), but a total miss is [`SecretError::MissingSecret`].
    pub fn require(&self, key: &str, options: &GetOptions) -> Result<String> {
        self.get(key, options)?
            .ok_or_else(|| SecretError::MissingSecret(key.to_string()))
    }

    /// Store `value` under `key` in the adapter and, with `persist_env`, in
    /// every env file.
    pub fn set(&self, key: &str, value: &str, persist_env: bool) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SecretError::Validation(format!(
                "value for '{key}' must not be empty"
            )));
        }
        let written = self.write_value(key, value, persist_env)?;
        self.ledger.append(
            "secret_set",
            json!({ "key": key, "persist_env": persist_env }),
            true,
            json!({ "preview": redact_preview(value), "sources": written }),
        )?;
        Ok(())
    }

    fn write_value(&self, key: &str, value: &str, persist_env: bool) -> Result<Vec<Source>> {
        validate_key(key)?;
        let mut written = Vec::new();

        self.adapter.set_secret(&self.namespace, key, value)?;
        self.metadata.touch_write(&self.namespace, key, Source::Adapter);
        written.push(Source::Adapter);

        if persist_env {
            if let Some(secure) = &self.secure_env {
                secure.set(key, value)?;
                self.metadata.touch_write(&self.namespace, key, Source::SecureEnv);
                written.push(Source::SecureEnv);
            }
            self.env.set(key, value)?;
            self.metadata.touch_write(&self.namespace, key, Source::Env);
            written.push(Source::Env);
        }
        Ok(written)
    }

    /// Remove `key` from every location.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.adapter.delete_secret(&self.namespace, key)?;
        let mut removed = vec![Source::Adapter];
        if let Some(secure) = &self.secure_env {
            if secure.remove(key)? {
                removed.push(Source::SecureEnv);
            }
        }
        if self.env.remove(key)? {
            removed.push(Source::Env);
        }
        self.metadata.remove(&self.namespace, key);
        self.ledger.append(
            "secret_delete",
            json!({ "key": key }),
            true,
            json!({ "sources": removed }),
        )?;
        Ok(())
    }

    /// Every key the store knows about, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys: BTreeSet<String> = self
            .adapter
            .list_entries()?
            .into_iter()
            .filter(|entry| entry.namespace == self.namespace)
            .map(|entry| entry.key)
            .collect();
        keys.extend(self.metadata.keys(&self.namespace));
        if let Some(secure) = &self.secure_env {
            keys.extend(secure.keys()?);
        }
        keys.extend(self.env.keys()?);
        Ok(keys.into_iter().collect())
    }

    /// Value observed in each source, per key. Keys no source holds are omitted.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        for key in self.keys()? {
            let mut values = BTreeMap::new();
            for source in self.configured_sources() {
                if let Some(value) = self.read_source(source, &key)? {
                    values.insert(source, value);
                }
            }
            if !values.is_empty() {
                snapshot.insert(key, values);
            }
        }
        Ok(snapshot)
    }

    pub fn metadata(&self, key: &str) -> Option<Metadata> {
        self.metadata.get(&self.namespace, key)
    }

    /// Replace the values of `keys` (or of every known key) with fresh
    /// URL-safe random values of `length` bytes. Returns how many were rotated.
    pub fn rotate(&self, keys: Option<&[String]>, length: usize) -> Result<usize> {
        if length == 0 {
            return Err(SecretError::Validation("rotation length must be positive".into()));
        }
        let snapshot = self.snapshot()?;
        let targets: Vec<String> = match keys {
            Some(requested) => requested
                .iter()
                .filter(|key| {
                    let known = snapshot.contains_key(key.as_str());
                    if !known {
                        warn!(key = key.as_str(), "skipping rotation of unknown secret");
                    }
                    known
                })
                .cloned()
                .collect(),
            None => snapshot.keys().cloned().collect(),
        };

        for key in &targets {
            let in_env = snapshot
                .get(key)
                .is_some_and(|sources| sources.keys().any(|s| *s != Source::Adapter));
            let value = crypto::token_urlsafe(length);
            self.set(key, &value, in_env)?;
        }

        self.ledger.append(
            "secret_rotate",
            json!({ "keys": keys, "length": length }),
            true,
            json!({ "count": targets.len(), "rotated": targets }),
        )?;
        Ok(targets.len())
    }

    /// Audit the adapter contents across every namespace.
    pub fn health_report(&self, stale_after: Duration) -> Result<HealthReport> {
        let entries = self.adapter.list_entries()?;
        let now = Utc::now();
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut missing = BTreeSet::new();
        let mut stale = BTreeSet::new();

        for entry in &entries {
            *seen.entry(entry.label()).or_default() += 1;
            if entry.key.is_empty() {
                missing.insert(entry.namespace.clone());
            }
            let is_stale = match self.metadata.get(&entry.namespace, &entry.key) {
                Some(meta) if meta.modified.is_some() => meta.is_stale(now, stale_after),
                _ => modified_from_entry(entry).is_some_and(|m| m < now - stale_after),
            };
            if is_stale {
                stale.insert(entry.label());
            }
        }

        Ok(HealthReport {
            total: entries.len(),
            duplicates: seen
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(label, _)| label)
                .collect(),
            missing_keys: missing.into_iter().collect(),
            stale: stale.into_iter().collect(),
        })
    }

    /// Rebuild the metadata index from the adapter's entries.
    ///
    /// Returns how many entries the index now tracks.
    pub fn reindex(&self) -> Result<usize> {
        let entries = self.adapter.list_entries()?;
        self.metadata.rebuild(&entries);
        self.ledger.append(
            "metadata_reindex",
            json!({}),
            true,
            json!({ "count": entries.len() }),
        )?;
        Ok(entries.len())
    }

    /// Every adapter entry with its value and metadata, for backups.
    ///
    /// The ledger signing key stays behind: it identifies this installation's
    /// ledger and is never restored over another one.
    pub fn export_entries(&self) -> Result<Vec<SecretEntry>> {
        let mut exported = Vec::new();
        for entry in self.adapter.list_entries()? {
            if entry.namespace == AUDIT_NAMESPACE {
                continue;
            }
            let Some(value) = self.adapter.get_secret(&entry.namespace, &entry.key)? else {
                continue;
            };
            let mut metadata = entry.metadata.clone();
            if let Some(meta) = self.metadata.get(&entry.namespace, &entry.key) {
                metadata.extend(meta.to_map());
            }
            exported.push(
                SecretEntry::new(entry.namespace, entry.key)
                    .with_value(value)
                    .with_metadata(metadata),
            );
        }
        self.ledger.append(
            "backup_export",
            json!({}),
            true,
            json!({ "count": exported.len() }),
        )?;
        Ok(exported)
    }

    /// Write backed-up entries into the adapter. Existing entries are kept
    /// unless `replace_existing`. Returns how many were written.
    pub fn import_entries(&self, entries: &[SecretEntry], replace_existing: bool) -> Result<usize> {
        let mut imported = 0;
        for entry in entries {
            let Some(value) = entry.value.as_deref() else {
                continue;
            };
            if entry.namespace == AUDIT_NAMESPACE {
                warn!("ignoring ledger signing key in imported entries");
                continue;
            }
            if !replace_existing
                && self
                    .adapter
                    .get_secret(&entry.namespace, &entry.key)?
                    .is_some()
            {
                continue;
            }
            self.adapter.set_secret(&entry.namespace, &entry.key, value)?;
            self.metadata
                .touch_write(&entry.namespace, &entry.key, Source::Adapter);
            imported += 1;
        }
        self.ledger.append(
            "backup_import",
            json!({ "replace_existing": replace_existing }),
            true,
            json!({ "count": imported, "offered": entries.len() }),
        )?;
        Ok(imported)
    }

    /// Append an arbitrary record to the ledger on behalf of a collaborator.
    pub fn audit(&self, action: &str, params: Value, ok: bool, result: Value) -> Result<()> {
        self.ledger.append(action, params, ok, result).map(|_| ())
    }
}

fn modified_from_entry(entry: &SecretEntry) -> Option<DateTime<Utc>> {
    entry
        .metadata
        .get("modified")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(SecretError::Validation("secret key must not be empty".into()));
    }
    Ok(())
}

/// First two and last two characters with the middle masked. Values of four
/// characters or fewer are masked entirely.
pub fn redact_preview(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 4))
}
