//! Path resolution utilities.
//!
//! Every piece of persistent GNOMAN state lives under one state directory,
//! `~/.gnoman` unless `GNOMAN_STATE_DIR` (or the older `GNOMAN_HOME`) says
//! otherwise.

use crate::env::{self, vars};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the GNOMAN state directory (~/.gnoman or the env override).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let override_dir = env::get_var(vars::GNOMAN_STATE_DIR).or_else(|| env::get_var(vars::GNOMAN_HOME));
    resolve_base_dir(override_dir.as_deref())
}

/// Resolve the state directory from an optional override.
pub fn resolve_base_dir(override_dir: Option<&str>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = override_dir {
        return Ok(expand_tilde(dir));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".gnoman"))
}

/// Get the main config file path (~/.gnoman/gnoman.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::get_var(vars::GNOMAN_CONFIG) {
        return Ok(expand_tilde(&path));
    }
    Ok(base_dir()?.join("gnoman.json5"))
}

/// Encrypted-file adapter document inside `base`.
pub fn keyring_file(base: &Path) -> PathBuf {
    base.join("keyring.json")
}

/// Index of `(namespace, key)` pairs known to the native adapter.
pub fn native_index_file(base: &Path) -> PathBuf {
    base.join("keyring_index.json")
}

/// Sidecar metadata index.
pub fn metadata_index_file(base: &Path) -> PathBuf {
    base.join("secrets_index.json")
}

/// Append-only audit ledger.
pub fn audit_log_file(base: &Path) -> PathBuf {
    base.join("audit").join("gnoman_audit.jsonl")
}

/// Default directory for encrypted backups.
pub fn backups_dir(base: &Path) -> PathBuf {
    base.join("backups")
}

/// Ensure `dir` exists with owner-only permissions on Unix.
pub fn ensure_private_dir(dir: &Path) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
