//! Configuration loading and persistence.

use super::{BackendPreference, Config, KdfConfig, AUDIT_NAMESPACE};
use crate::env::{self, vars};
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        // 1. Namespace must be usable as a keyring service name
        let service = self.keyring.service.trim();
        if service.is_empty() {
            errors.push("Keyring service must not be empty".to_string());
        } else if service.contains('/') {
            errors.push(format!(
                "Keyring service '{}' must not contain '/'",
                self.keyring.service
            ));
        } else if service == AUDIT_NAMESPACE {
            errors.push(format!(
                "Keyring service '{AUDIT_NAMESPACE}' is reserved for the audit signing key"
            ));
        }

        // 2. Env files must be distinct
        if self.env.secure_env_file.as_deref() == Some(self.env.env_file.as_path()) {
            errors.push(format!(
                "Secure env file must differ from env file ({})",
                self.env.env_file.display()
            ));
        }

        // 3. Staleness threshold
        if self.audit.stale_after_days == 0 {
            errors.push("Audit stale_after_days must be greater than 0".to_string());
        }

        // 4. KDF cost parameters
        errors.extend(self.backup.kdf.problems());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load configuration from the default path, falling back to defaults if no file exists.
    ///
    /// Environment overrides are applied in both cases.
    pub fn load_or_default() -> Self {
        let mut config = match Self::load_default() {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => {
                warn!("ignoring unreadable config file: {e}");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config
    }

    /// Apply `GNOMAN_*` environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env::get_var);
    }

    /// Apply overrides from an arbitrary lookup (the process environment in production).
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(vars::GNOMAN_STATE_DIR).or_else(|| lookup(vars::GNOMAN_HOME)) {
            self.state_dir = Some(paths::expand_tilde(&dir));
        }
        if let Some(service) = lookup(vars::GNOMAN_KEYRING_SERVICE) {
            self.keyring.service = service;
        }
        if let Some(backend) = lookup(vars::GNOMAN_KEYRING_BACKEND) {
            match backend.parse::<BackendPreference>() {
                Ok(pref) => self.keyring.backend = pref,
                Err(e) => warn!("{}: {e}", vars::GNOMAN_KEYRING_BACKEND),
            }
        }
        if let Some(path) = lookup(vars::GNOMAN_KEYRING_PATH) {
            self.keyring.file_path = Some(paths::expand_tilde(&path));
        }
        if let Some(days) = lookup(vars::GNOMAN_STALE_AFTER_DAYS) {
            match days.trim().parse::<u32>() {
                Ok(days) => self.audit.stale_after_days = days,
                Err(e) => warn!("{}: {e}", vars::GNOMAN_STALE_AFTER_DAYS),
            }
        }
        if let Some(flag) = lookup(vars::GNOMAN_LOG_JSON) {
            self.logging.json = env::parse_bool(&flag);
        }
    }

    /// Resolved state directory.
    pub fn state_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::base_dir(),
        }
    }

    /// Resolved encrypted-file adapter document.
    pub fn keyring_file_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.keyring.file_path {
            Some(path) => Ok(path.clone()),
            None => Ok(paths::keyring_file(&self.state_dir()?)),
        }
    }

    /// Resolved native adapter index file.
    pub fn native_index_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(paths::native_index_file(&self.state_dir()?))
    }

    /// Resolved metadata index file.
    pub fn metadata_index_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(paths::metadata_index_file(&self.state_dir()?))
    }

    /// Resolved audit ledger file.
    pub fn audit_log_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.audit.log_path {
            Some(path) => Ok(path.clone()),
            None => Ok(paths::audit_log_file(&self.state_dir()?)),
        }
    }
}

/// Configuration builder for creating configs programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state directory.
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.state_dir = Some(dir.into());
        self
    }

    /// Set the keyring namespace.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.config.keyring.service = service.into();
        self
    }

    /// Set the adapter preference.
    pub fn backend(mut self, backend: BackendPreference) -> Self {
        self.config.keyring.backend = backend;
        self
    }

    /// Set the plain env file.
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.env.env_file = path.into();
        self
    }

    /// Set (or clear) the secure env file.
    pub fn secure_env_file(mut self, path: Option<PathBuf>) -> Self {
        self.config.env.secure_env_file = path;
        self
    }

    /// Set the staleness threshold.
    pub fn stale_after_days(mut self, days: u32) -> Self {
        self.config.audit.stale_after_days = days;
        self
    }

    /// Set the backup key derivation.
    pub fn kdf(mut self, kdf: KdfConfig) -> Self {
        self.config.backup.kdf = kdf;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
