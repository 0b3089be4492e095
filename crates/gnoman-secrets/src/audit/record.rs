//! Ledger record shape and canonical serialization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto;

/// One line of the audit ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Hash of the preceding record; empty for the first record.
    pub previous_hash: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub action: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub result: Map<String, Value>,
    pub ok: bool,
    pub hash: String,
    pub signature: String,
}

impl AuditRecord {
    /// Fields covered by `hash`.
    pub(crate) fn hashed_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("previous_hash".into(), Value::String(self.previous_hash.clone()));
        body.insert("timestamp".into(), Value::from(self.timestamp));
        body.insert("action".into(), Value::String(self.action.clone()));
        body.insert("params".into(), Value::Object(self.params.clone()));
        body.insert("result".into(), Value::Object(self.result.clone()));
        body.insert("ok".into(), Value::Bool(self.ok));
        Value::Object(body)
    }

    /// Fields covered by `signature`: the hashed body plus the hash itself.
    pub(crate) fn signed_body(&self) -> Value {
        let mut body = self.hashed_body();
        if let Value::Object(map) = &mut body {
            map.insert("hash".into(), Value::String(self.hash.clone()));
        }
        body
    }

    /// SHA-256 over the canonical hashed body.
    pub fn compute_hash(&self) -> String {
        crypto::sha256_hex(canonical_json(&self.hashed_body()).as_bytes())
    }

    pub(crate) fn signing_message(&self) -> Vec<u8> {
        canonical_json(&self.signed_body()).into_bytes()
    }
}

/// Deterministic JSON: object keys sorted at every depth, no whitespace.
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Coerce caller-supplied params/result into an object.
pub(crate) fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": 1, "a": {"z": true, "m": [ {"y": 1, "x": 2} ]}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"m":[{"x":2,"y":1}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn test_into_object() {
        assert!(into_object(Value::Null).is_empty());
        assert_eq!(into_object(json!({"k": 1}))["k"], 1);
        assert_eq!(into_object(json!(3))["value"], 3);
    }

    #[test]
    fn test_hash_covers_every_field() {
        let record = AuditRecord {
            previous_hash: String::new(),
            timestamp: 1_700_000_000.25,
            action: "secret_set".into(),
            params: into_object(json!({"key": "K"})),
            result: Map::new(),
            ok: true,
            hash: String::new(),
            signature: String::new(),
        };
        let base = record.compute_hash();

        let mut changed = record.clone();
        changed.ok = false;
        assert_ne!(changed.compute_hash(), base);

        let mut changed = record.clone();
        changed.timestamp += 0.001;
        assert_ne!(changed.compute_hash(), base);

        let mut changed = record;
        changed.previous_hash = "00".into();
        assert_ne!(changed.compute_hash(), base);
    }
}
