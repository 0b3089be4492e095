//! Core types shared by the trust store components.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// One secret as seen by an adapter.
///
/// `value` is `None` when the entry comes from an enumeration, which never
/// carries cleartext. On the wire the namespace and key are spelled
/// `service` and `username`, matching the metadata index and backup formats.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretEntry {
    #[serde(rename = "service")]
    pub namespace: String,

    #[serde(rename = "username")]
    pub key: String,

    #[serde(rename = "secret", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SecretEntry {
    /// An entry without a value.
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value: None,
            metadata: Map::new(),
        }
    }

    /// Attach a value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// `namespace/key`, for reports.
    pub fn label(&self) -> String {
        format!("{}/{}", self.namespace, self.key)
    }
}

impl fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretEntry")
            .field("namespace", &self.namespace)
            .field("key", &self.key)
            .field("value", &self.value.as_ref().map(|_| "[REDACTED]"))
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// A place a secret value can live.
///
/// Declaration order is reconciliation priority: the adapter wins over the
/// secure env file, which wins over the plain env file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Adapter,
    SecureEnv,
    Env,
}

impl Source {
    /// All sources in priority order.
    pub const PRIORITY: [Source; 3] = [Source::Adapter, Source::SecureEnv, Source::Env];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adapter => "adapter",
            Self::SecureEnv => "secure_env",
            Self::Env => "env",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adapter" | "keyring" => Ok(Self::Adapter),
            "secure_env" | "secure" | "env_secure" => Ok(Self::SecureEnv),
            "env" => Ok(Self::Env),
            other => Err(format!(
                "unknown source '{other}' (expected adapter, secure_env or env)"
            )),
        }
    }
}

/// Per-secret provenance kept by the metadata index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,

    #[serde(default)]
    pub sources: BTreeSet<Source>,
}

impl Metadata {
    /// Whether `modified` is older than `threshold` at `now`.
    ///
    /// Entries that were never written are not considered stale.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.modified.is_some_and(|modified| modified < now - threshold)
    }

    /// JSON object form, as attached to [`SecretEntry::metadata`].
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Value held by each source, per key.
pub type Snapshot = BTreeMap<String, BTreeMap<Source, String>>;

/// Keys whose values disagree across two or more sources.
pub type DriftReport = BTreeMap<String, BTreeMap<Source, String>>;
