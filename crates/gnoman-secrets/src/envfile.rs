//! `KEY=value` files (`.env`, `.env.secure`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, SecretError};
use crate::fsutil;

/// One env file with a lazily loaded cache.
///
/// Blank lines and `#` comments are ignored on load and are not preserved:
/// every mutation rewrites the file as sorted `KEY=value` lines.
pub struct EnvFileStore {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, String>>>,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_values(|values| values.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_pair(key, value)?;
        self.mutate(|values| {
            values.insert(key.to_string(), value.to_string());
            true
        })
    }

    /// Remove `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut removed = false;
        self.mutate(|values| {
            removed = values.remove(key).is_some();
            removed
        })?;
        Ok(removed)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_values(|values| values.keys().cloned().collect())
    }

    pub fn snapshot(&self) -> Result<BTreeMap<String, String>> {
        self.with_values(|values| values.clone())
    }

    fn with_values<T>(&self, f: impl FnOnce(&BTreeMap<String, String>) -> T) -> Result<T> {
        let mut cache = self.cache.lock();
        if cache.is_none() {
            *cache = Some(self.load()?);
        }
        let values = cache.get_or_insert_with(BTreeMap::new);
        Ok(f(values))
    }

    /// Apply `f`; flush when it reports a change.
    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let mut cache = self.cache.lock();
        if cache.is_none() {
            *cache = Some(self.load()?);
        }
        let values = cache.get_or_insert_with(BTreeMap::new);
        if f(values) {
            self.flush(values)?;
        }
        Ok(())
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        parse(&self.path, &content)
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let mut out = String::new();
        for (key, value) in values {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        fsutil::write_atomic(&self.path, out.as_bytes())?;
        debug!(path = %self.path.display(), keys = values.len(), "env file written");
        Ok(())
    }
}

fn parse(path: &Path, content: &str) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(SecretError::MalformedEnvLine {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: "expected KEY=value".to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(SecretError::MalformedEnvLine {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: "empty key".to_string(),
            });
        }
        values.insert(key.to_string(), value.trim().to_string());
    }
    Ok(values)
}

fn validate_pair(key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(SecretError::Validation("env key must not be empty".into()));
    }
    if key.contains('=') {
        return Err(SecretError::Validation(format!(
            "env key '{key}' must not contain '='"
        )));
    }
    if has_newline(key) || has_newline(value) {
        return Err(SecretError::Validation(format!(
            "env entry '{}' must not contain a newline",
            key.trim()
        )));
    }
    Ok(())
}

fn has_newline(s: &str) -> bool {
    s.contains(|c: char| c == '\n' || c == '\r')
}
